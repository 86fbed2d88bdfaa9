pub mod word_count;

use std::path::PathBuf;

use crate::input::LocalInputSet;
use crate::provenance::ProvenanceRecord;
use crate::status::Status;

pub use word_count::WordCountProcessor;

pub struct ProcessingResult {
    pub status: Status,
    pub output_root_path: PathBuf,
    pub step_provenance: Option<ProvenanceRecord>,
}

impl ProcessingResult {
    pub fn failed(message: impl Into<String>, output_root_path: PathBuf) -> Self {
        Self {
            status: Status::error(message),
            output_root_path,
            step_provenance: None,
        }
    }
}

/// The transformation applied to one asset.
///
/// Implementations read from `input.input_file_path`, write under the
/// [`crate::storage::OutputLayout`] directory of the matching output type,
/// and report failure through `status` instead of returning an error.
pub trait ProcessingStep: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, input: &LocalInputSet) -> ProcessingResult;
}
