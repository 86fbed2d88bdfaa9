//! What happens to an asset's input and output once it has been processed.
//!
//! Order is fixed: transfer the output (if asked), then delete local
//! output (if asked), then delete the input (if asked). A failed or
//! misconfigured transfer stops everything after it. A refused or failed
//! output deletion only produces a warning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, OutputConfig};
use crate::error::{StorageError, TransferError};
use crate::remote::{s3_uri, RemoteStore};
use crate::storage::cleanup::{delete_input, delete_local_output};
use crate::storage::{OutputLayout, OutputType};

#[derive(Error, Debug)]
pub enum DispositionError {
    #[error("transfer requested without all the necessary S3 settings (missing: {missing})")]
    Configuration { missing: String },

    #[error("failed to transfer output to S3: {0}")]
    Transfer(#[from] TransferError),

    #[error("could not delete the input file: {0}")]
    InputCleanup(#[source] StorageError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispositionPolicy {
    pub delete_input_on_completion: bool,
    pub delete_output_on_completion: bool,
    pub transfer_output_on_completion: bool,
}

impl DispositionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            delete_input_on_completion: config.input.delete_on_completion,
            delete_output_on_completion: config.output.delete_on_completion,
            transfer_output_on_completion: config.output.transfer_on_completion,
        }
    }
}

/// Fully populated S3 output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTarget {
    pub endpoint: String,
    pub bucket: String,
    pub folder: String,
}

impl TransferTarget {
    /// All three settings are mandatory once transfer is requested.
    pub fn from_config(output: &OutputConfig) -> Result<Self, DispositionError> {
        let fields = [
            ("s3_endpoint_url", &output.s3_endpoint_url),
            ("s3_bucket", &output.s3_bucket),
            ("s3_folder_in_bucket", &output.s3_folder_in_bucket),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(DispositionError::Configuration {
                missing: missing.join(", "),
            });
        }

        let value = |field: &Option<String>| field.as_deref().unwrap_or_default().to_string();
        Ok(Self {
            endpoint: value(&output.s3_endpoint_url),
            bucket: value(&output.s3_bucket),
            folder: value(&output.s3_folder_in_bucket),
        })
    }

    /// `<folder>/<source_id>`, the key prefix the output archive goes under.
    pub fn key_prefix(&self, source_id: &str) -> String {
        match self.folder.trim_matches('/') {
            "" => source_id.to_string(),
            folder => format!("{}/{}", folder, source_id),
        }
    }

    /// Final location of the output archive.
    pub fn output_uri(&self, source_id: &str) -> String {
        s3_uri(
            &self.bucket,
            &format!(
                "{}/{}",
                self.key_prefix(source_id),
                OutputLayout::archive_file_name(source_id)
            ),
        )
    }
}

/// What disposition did. Warnings are cleanup problems that did not fail
/// the run.
#[derive(Debug, Default)]
pub struct DispositionReport {
    pub uploaded_uri: Option<String>,
    pub output_deleted: bool,
    pub input_deleted: bool,
    pub warnings: Vec<StorageError>,
}

pub struct DispositionManager {
    layout: OutputLayout,
    output: OutputConfig,
    remote: Arc<dyn RemoteStore>,
}

impl DispositionManager {
    pub fn new(layout: OutputLayout, output: &OutputConfig, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            layout,
            output: output.clone(),
            remote,
        }
    }

    pub fn dispose(
        &self,
        source_id: &str,
        policy: &DispositionPolicy,
        input_path: &Path,
    ) -> Result<DispositionReport, DispositionError> {
        let mut report = DispositionReport::default();
        let output_dir = self.layout.base_output_dir(Some(source_id));

        if policy.transfer_output_on_completion {
            report.uploaded_uri = Some(self.transfer(source_id, &output_dir)?);
        } else {
            info!("Transfer on completion disabled, leaving output on local disk");
        }

        if policy.delete_output_on_completion {
            match delete_local_output(&output_dir, &self.output.required_types) {
                Ok(()) => report.output_deleted = true,
                Err(e) => {
                    warn!("Could not delete output files: {}", e);
                    report.warnings.push(e);
                }
            }
        }

        if policy.delete_input_on_completion {
            info!("Verifying deletion of input file: {}", input_path.display());
            let staging_dir = self.layout.input_staging_dir(source_id);
            let warnings = delete_input(input_path, &staging_dir, &self.layout.download_dir())
                .map_err(DispositionError::InputCleanup)?;
            report.input_deleted = true;
            report.warnings.extend(warnings);
        } else {
            info!("Configured to leave the input alone, skipping deletion");
        }

        Ok(report)
    }

    fn transfer(&self, source_id: &str, output_dir: &Path) -> Result<String, DispositionError> {
        info!(
            "Transferring {} to S3 (asset={})",
            output_dir.display(),
            source_id
        );
        let target = TransferTarget::from_config(&self.output)?;

        let sources: Vec<PathBuf> = self
            .output
            .transfer_types
            .iter()
            .map(|t: &OutputType| self.layout.output_dir(source_id, *t))
            .collect();
        let archive_path = self.layout.archive_file_path(source_id);

        let key = self.remote.upload(
            &target.bucket,
            &target.key_prefix(source_id),
            &sources,
            &archive_path,
        )?;
        let uri = s3_uri(&target.bucket, &key);
        info!("Uploaded output to {}", uri);
        Ok(uri)
    }
}
