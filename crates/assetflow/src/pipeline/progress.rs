use tracing::{info, warn};

use super::context::RunState;

/// Events emitted by the pipeline during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Transition { state: RunState, message: String },
    Completed { provenance_path: String },
    Failed { state: u16, error: String },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Logs every event inside the current pipeline span.
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Transition { state, message } => {
                info!(state = %state, "{}", message);
            }
            ProgressEvent::Completed { provenance_path } => {
                info!(provenance = %provenance_path, "Run completed");
            }
            ProgressEvent::Failed { state, error } => {
                warn!(state, "Run failed: {}", error);
            }
        }
    }
}
