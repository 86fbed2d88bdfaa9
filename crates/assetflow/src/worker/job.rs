use std::path::PathBuf;

use serde::Serialize;

use crate::pipeline::PipelineResult;
use crate::status::{Status, STATE_OK};

/// One unit of work as delivered by the task queue.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// `s3://` URI, local input archive, or extracted input directory.
    pub input_reference: String,
}

impl Job {
    pub fn new(input_reference: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            input_reference: input_reference.into(),
        }
    }

    pub fn with_id(id: impl Into<String>, input_reference: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_reference: input_reference.into(),
        }
    }
}

/// Acknowledgement payload for the task queue.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_id: String,
    pub input_reference: String,
    pub state: u16,
    pub message: String,
    pub provenance_path: Option<PathBuf>,
}

impl JobResult {
    pub fn from_pipeline(job: &Job, result: &PipelineResult) -> Self {
        Self {
            job_id: job.id.clone(),
            input_reference: job.input_reference.clone(),
            state: result.state,
            message: result.message.clone(),
            provenance_path: result.provenance_path.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == STATE_OK
    }

    pub fn status(&self) -> Status {
        Status::new(self.state, self.message.clone())
    }
}
