use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::disposition::DispositionReport;
use crate::input::LocalInputSet;
use crate::processor::ProcessingResult;
use crate::provenance::SealedProvenance;
use crate::storage::OutputType;
use crate::worker::job::Job;

use super::error::PipelineWarning;

/// Where a run is. `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    InputResolved,
    OutputStaged,
    Processed,
    ProvenanceSealed,
    Disposed,
    Done,
    Error,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::InputResolved => "input_resolved",
            RunState::OutputStaged => "output_staged",
            RunState::Processed => "processed",
            RunState::ProvenanceSealed => "provenance_sealed",
            RunState::Disposed => "disposed",
            RunState::Done => "done",
            RunState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Error)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct PipelineContext {
    // Input
    pub job: Job,

    pub state: RunState,

    // Set once the input is resolved; `source_id` never changes afterwards
    pub input: Option<LocalInputSet>,

    pub output_dirs: BTreeMap<OutputType, PathBuf>,

    pub processing: Option<ProcessingResult>,

    // Written to disk before disposition starts
    pub provenance: Option<SealedProvenance>,

    pub disposition: Option<DispositionReport>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            state: RunState::Init,
            input: None,
            output_dirs: BTreeMap::new(),
            processing: None,
            provenance: None,
            disposition: None,
            warnings: Vec::new(),
        }
    }

    pub fn source_id(&self) -> Option<&str> {
        self.input.as_ref().map(|input| input.source_id.as_str())
    }
}
