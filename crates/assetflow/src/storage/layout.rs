//! Where an asset's input is staged and its output is written.
//!
//! Everything lives under one base mount:
//!
//! ```text
//! <base_mount>/<input_dir>/<source_id>/<input archive>
//! <base_mount>/<output_dir>/<source_id>/<output type>/<file name>
//! <base_mount>/<output_dir>/<source_id>/base_name__<source_id>.tar.gz
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FileSystemConfig;
use crate::error::StorageError;

pub const ARCHIVE_EXTENSION: &str = ".tar.gz";
pub const OUTPUT_FILE_BASE_NAME: &str = "base_name";
pub const SOURCE_ID_DELIMITER: &str = "__";

const SOURCE_ID_PLACEHOLDER: &str = "{source_id}";

/// Categories of artifact a run can produce. `Provenance` is always produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Provenance,
    Foobar,
}

struct OutputSpec {
    dir_name: &'static str,
    file_name: &'static str,
}

// Indexed by `OutputType as usize`; a new variant needs exactly one new row.
static OUTPUT_SPECS: [OutputSpec; 2] = [
    OutputSpec {
        dir_name: "provenance",
        file_name: "provenance.json",
    },
    OutputSpec {
        dir_name: "foobar",
        file_name: "{source_id}_foobar.txt",
    },
];

impl OutputType {
    pub const ALL: [OutputType; 2] = [OutputType::Provenance, OutputType::Foobar];

    fn spec(self) -> &'static OutputSpec {
        &OUTPUT_SPECS[self as usize]
    }

    /// Name of this type's subdirectory under the asset output root.
    pub fn dir_name(self) -> &'static str {
        self.spec().dir_name
    }

    /// Deterministic file name of this type's artifact for `source_id`.
    pub fn file_name(self, source_id: &str) -> String {
        self.spec()
            .file_name
            .replace(SOURCE_ID_PLACEHOLDER, source_id)
    }
}

impl std::fmt::Display for OutputType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone)]
pub struct OutputLayout {
    base_mount: PathBuf,
    input_dir: String,
    output_dir: String,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(base_mount: P, input_dir: &str, output_dir: &str) -> Self {
        Self {
            base_mount: base_mount.as_ref().to_path_buf(),
            input_dir: input_dir.to_string(),
            output_dir: output_dir.to_string(),
        }
    }

    pub fn from_config(config: &FileSystemConfig) -> Self {
        Self::new(&config.base_mount, &config.input_dir, &config.output_dir)
    }

    pub fn base_mount(&self) -> &Path {
        &self.base_mount
    }

    /// `<base_mount>/<output_dir>[/<source_id>]`. Pure path composition.
    pub fn base_output_dir(&self, source_id: Option<&str>) -> PathBuf {
        let base = self.base_mount.join(&self.output_dir);
        match source_id {
            Some(id) if !id.is_empty() => base.join(id),
            _ => base,
        }
    }

    /// General location remote input is downloaded into.
    pub fn download_dir(&self) -> PathBuf {
        self.base_mount.join(&self.input_dir)
    }

    /// Per-asset staging directory inside the download dir.
    pub fn input_staging_dir(&self, source_id: &str) -> PathBuf {
        self.download_dir().join(source_id)
    }

    pub fn output_dir(&self, source_id: &str, output_type: OutputType) -> PathBuf {
        self.base_output_dir(Some(source_id))
            .join(output_type.dir_name())
    }

    pub fn output_file_path(&self, source_id: &str, output_type: OutputType) -> PathBuf {
        self.output_dir(source_id, output_type)
            .join(output_type.file_name(source_id))
    }

    /// `base_name__<source_id>.tar.gz`
    pub fn archive_file_name(source_id: &str) -> String {
        format!(
            "{}{}{}{}",
            OUTPUT_FILE_BASE_NAME, SOURCE_ID_DELIMITER, source_id, ARCHIVE_EXTENSION
        )
    }

    /// Location of the archive that gets uploaded on transfer.
    pub fn archive_file_path(&self, source_id: &str) -> PathBuf {
        self.base_output_dir(Some(source_id))
            .join(Self::archive_file_name(source_id))
    }

    /// Creates one subdirectory per output type. Existing directories are kept.
    pub fn ensure_output_dirs(
        &self,
        source_id: &str,
    ) -> Result<BTreeMap<OutputType, PathBuf>, StorageError> {
        let mut dirs = BTreeMap::new();
        for output_type in OutputType::ALL {
            let dir = self.output_dir(source_id, output_type);
            ensure_directory(&dir)?;
            dirs.insert(output_type, dir);
        }
        Ok(dirs)
    }

    /// Checks the base mount exists, then creates the download and output roots.
    pub fn validate_data_dirs(&self) -> Result<(), StorageError> {
        if !self.base_mount.is_dir() {
            return Err(StorageError::MissingBaseMount(self.base_mount.clone()));
        }
        ensure_directory(&self.download_dir())?;
        ensure_directory(&self.base_output_dir(None))?;
        Ok(())
    }
}

pub(crate) fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.is_dir() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Created directory {}", path.display());
    }
    Ok(())
}
