//! Provenance: the ordered audit trail of every step of a run.
//!
//! Step records are appended in execution order (download, processing) and
//! the top-level record describing the whole run closes the chain. The
//! sealed chain is written to `provenance/provenance.json`.

pub mod builder;
pub mod record;

pub use builder::{software_versions, PersistenceError, ProvenanceBuilder, SealedProvenance};
pub use record::{ProvenanceChain, ProvenanceRecord, StepTimer};
