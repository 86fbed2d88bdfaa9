use std::path::PathBuf;

use serde::Serialize;

use crate::provenance::{ProvenanceChain, SealedProvenance};
use crate::status::{Status, STATE_OK};

pub const SUCCESS_MESSAGE: &str = "Successfully applied model";

/// What the task queue gets back from a run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub state: u16,
    pub message: String,
    /// Present whenever the run got as far as sealing the chain, including
    /// runs that failed afterwards during disposition.
    pub provenance: Option<ProvenanceChain>,
    pub provenance_path: Option<PathBuf>,
}

impl PipelineResult {
    pub fn new(state: u16, message: impl Into<String>, sealed: Option<&SealedProvenance>) -> Self {
        Self {
            state,
            message: message.into(),
            provenance: sealed.map(|s| s.chain().clone()),
            provenance_path: sealed.map(|s| s.path().to_path_buf()),
        }
    }

    pub fn success(sealed: &SealedProvenance) -> Self {
        Self::new(STATE_OK, SUCCESS_MESSAGE, Some(sealed))
    }

    pub fn is_success(&self) -> bool {
        self.state == STATE_OK
    }

    pub fn status(&self) -> Status {
        Status::new(self.state, self.message.clone())
    }
}
