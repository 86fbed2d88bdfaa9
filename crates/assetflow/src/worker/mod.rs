pub mod job;
pub mod queue;

pub use job::{Job, JobResult};
pub use queue::Worker;

// Re-export crossbeam_channel for callers that select over results
pub use crossbeam_channel;
