pub mod config;
pub mod disposition;
pub mod error;
pub mod input;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod provenance;
pub mod remote;
pub mod sanitize;
pub mod secrets;
pub mod status;
pub mod storage;
pub mod worker;

pub use config::{load_config, Config};
pub use disposition::{DispositionManager, DispositionPolicy, TransferTarget};
pub use error::{AssetflowError, ConfigError, ProcessError, Result, StorageError, TransferError, WorkerError};
pub use input::{InputResolver, LocalInputSet};
pub use logging::init_logging;
pub use pipeline::{Pipeline, PipelineConfig, PipelineContext, PipelineResult};
pub use processor::{ProcessingResult, ProcessingStep, WordCountProcessor};
pub use provenance::{ProvenanceChain, ProvenanceRecord};
pub use remote::{ObjectStoreRemote, RemoteStore};
pub use secrets::SecretError;
pub use status::Status;
pub use storage::{OutputLayout, OutputType};
pub use worker::{Job, JobResult, Worker};
