use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::record::{ProvenanceChain, ProvenanceRecord, StepTimer};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to serialize provenance chain: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write provenance file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Version map recorded in every top-level record.
pub fn software_versions(worker_id: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(worker_id.to_string(), env!("CARGO_PKG_VERSION").to_string())])
}

/// The not-yet-sealed top-level record plus the step records gathered so far.
///
/// The top-level timer starts at [`ProvenanceBuilder::open`] and stops at
/// [`ProvenanceBuilder::seal`], which consumes the builder so nothing can be
/// appended afterwards.
#[derive(Debug)]
pub struct ProvenanceBuilder {
    name: String,
    description: String,
    input_data: BTreeMap<String, String>,
    parameters: BTreeMap<String, serde_json::Value>,
    software_version: BTreeMap<String, String>,
    timer: StepTimer,
    chain: ProvenanceChain,
}

impl ProvenanceBuilder {
    pub fn open(
        name: &str,
        description: &str,
        input_data: BTreeMap<String, String>,
        parameters: BTreeMap<String, serde_json::Value>,
        software_version: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_data,
            parameters,
            software_version,
            timer: StepTimer::start(),
            chain: ProvenanceChain::default(),
        }
    }

    pub fn append(&mut self, record: ProvenanceRecord) {
        self.chain.push(record);
    }

    /// Entries the sealed chain would hold right now, top-level record included.
    pub fn entry_count(&self) -> usize {
        self.chain.len() + 1
    }

    /// Stops the top-level timer, closes the chain with the top-level record
    /// and writes the whole chain to `persist_path`.
    pub fn seal(
        self,
        output_data: BTreeMap<String, String>,
        persist_path: &Path,
    ) -> Result<SealedProvenance, PersistenceError> {
        let mut top_level = self
            .timer
            .finish(&self.name, &self.description)
            .with_parameters(self.parameters)
            .with_software_version(self.software_version);
        top_level.input_data = self.input_data;
        top_level.output_data = output_data;

        let mut chain = self.chain;
        chain.push(top_level);

        persist(&chain, persist_path)?;
        info!(
            "Persisted provenance chain ({} records) to {}",
            chain.len(),
            persist_path.display()
        );

        Ok(SealedProvenance {
            chain,
            path: persist_path.to_path_buf(),
        })
    }
}

fn persist(chain: &ProvenanceChain, path: &Path) -> Result<(), PersistenceError> {
    let json = serde_json::to_vec_pretty(chain)?;
    let write_error = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }

    // Write-then-rename so a reader never sees a truncated chain.
    let partial = path.with_extension("json.partial");
    std::fs::write(&partial, json).map_err(write_error)?;
    std::fs::rename(&partial, path).map_err(write_error)?;
    Ok(())
}

/// A chain that has been written to disk and can no longer change.
#[derive(Debug, Clone)]
pub struct SealedProvenance {
    chain: ProvenanceChain,
    path: PathBuf,
}

impl SealedProvenance {
    pub fn chain(&self) -> &ProvenanceChain {
        &self.chain
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
