use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::secrets::SecretSource;
use crate::storage::layout::OutputType;

pub const DEFAULT_WORKER_ID: &str = "assetflow-worker";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_worker_id")]
    pub worker_id: String,
    pub file_system: FileSystemConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Free-form settings of the processing step, recorded verbatim as the
    /// parameters of the top-level provenance record.
    #[serde(default)]
    pub worker_settings: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Minimal config rooted at `base_mount`: no transfer, nothing deleted.
    pub fn new(base_mount: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            worker_id: default_worker_id(),
            file_system: FileSystemConfig {
                base_mount: base_mount.into(),
                input_dir: default_input_dir(),
                output_dir: default_output_dir(),
            },
            input: InputConfig::default(),
            output: OutputConfig::default(),
            worker_settings: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_worker_id() -> String {
    DEFAULT_WORKER_ID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSystemConfig {
    pub base_mount: String,
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_input_dir() -> String {
    "input-files".to_string()
}

fn default_output_dir() -> String {
    "output-files".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub s3_endpoint_url: Option<String>,
    #[serde(default)]
    pub delete_on_completion: bool,
    #[serde(default)]
    pub credentials: S3Credentials,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub delete_on_completion: bool,
    #[serde(default)]
    pub transfer_on_completion: bool,
    #[serde(default)]
    pub s3_endpoint_url: Option<String>,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub s3_folder_in_bucket: Option<String>,
    /// Output subdirectories packed into the archive that gets uploaded.
    #[serde(default = "default_output_types")]
    pub transfer_types: Vec<OutputType>,
    /// Output subdirectories that must exist before local output may be deleted.
    #[serde(default = "default_output_types")]
    pub required_types: Vec<OutputType>,
    #[serde(default)]
    pub credentials: S3Credentials,
}

fn default_output_types() -> Vec<OutputType> {
    vec![OutputType::Provenance]
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delete_on_completion: false,
            transfer_on_completion: false,
            s3_endpoint_url: None,
            s3_bucket: None,
            s3_folder_in_bucket: None,
            transfer_types: default_output_types(),
            required_types: default_output_types(),
            credentials: S3Credentials::default(),
        }
    }
}

/// Explicit S3 credentials. When `access_key_id` is absent the standard
/// `AWS_*` environment variables are used instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Credentials {
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: SecretSource,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
