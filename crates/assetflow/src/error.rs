use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove directory '{path}': {source}")]
    RemoveDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive operation failed for '{path}': {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Base mount does not exist: {0}")]
    MissingBaseMount(PathBuf),

    #[error("Refused to delete '{path}': {reason}")]
    RefusedDeletion { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Invalid S3 URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Failed to connect to bucket '{bucket}': {source}")]
    Connect {
        bucket: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Failed to download s3://{bucket}/{key}: {source}")]
    Download {
        bucket: String,
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Local I/O failed for '{path}': {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build archive: {0}")]
    Archive(#[from] StorageError),

    #[error("Failed to start transfer runtime: {0}")]
    Runtime(std::io::Error),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("Failed to read input '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output '{path}': {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare input: {0}")]
    Extract(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, AssetflowError>;
