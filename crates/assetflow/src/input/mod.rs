//! Turning an input reference into a local input set.
//!
//! A reference is either an `s3://` URI, which gets downloaded into the
//! asset's staging directory, or a local path to an input archive or an
//! already-extracted directory, which is used where it is. Archives are
//! never unpacked here; see [`crate::storage::archive::extract`].

pub mod source_id;

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;
use tracing::{info, info_span};

use crate::error::{StorageError, TransferError};
use crate::provenance::{ProvenanceRecord, StepTimer};
use crate::remote::RemoteStore;
use crate::sanitize::redact_reference;
use crate::status::{Status, STATE_ERROR};
use crate::storage::archive::is_archive;
use crate::storage::layout::ensure_directory;
use crate::storage::OutputLayout;

pub use source_id::{source_id_from_archive_name, source_id_from_directory, source_id_from_uri};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid S3 URI: {reference} ({reason})")]
    InvalidReference { reference: String, reason: String },

    #[error("Cannot derive source_id from '{name}': expected <prefix>__<source_id>")]
    MalformedFileName { name: String },

    #[error("Failed to download input: {0}")]
    Transfer(#[from] TransferError),

    #[error("Failed to prepare staging directory: {0}")]
    Staging(#[from] StorageError),
}

impl ResolveError {
    pub fn state(&self) -> u16 {
        STATE_ERROR
    }
}

// Two or more characters, so `C:\` style drive letters stay local paths.
static RE_URI_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]+:").unwrap());

/// The three kinds of input a run accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputReference {
    Remote(String),
    LocalArchive(PathBuf),
    LocalDirectory(PathBuf),
}

impl InputReference {
    /// Anything that starts with a URI scheme is remote, whether or not it
    /// is a valid `s3://` URI; the resolver rejects invalid ones without
    /// downloading.
    pub fn parse(reference: &str) -> Self {
        if RE_URI_SCHEME.is_match(reference) {
            return InputReference::Remote(reference.to_string());
        }
        let path = PathBuf::from(reference);
        if is_archive(&path) {
            InputReference::LocalArchive(path)
        } else {
            InputReference::LocalDirectory(path)
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, InputReference::Remote(_))
    }
}

/// A resolved input, ready for processing.
#[derive(Debug, Clone)]
pub struct LocalInputSet {
    pub source_id: String,
    /// The archive file, or the root of an extracted archive.
    pub input_file_path: PathBuf,
    pub status: Status,
    /// Present only when the input had to be downloaded.
    pub download_provenance: Option<ProvenanceRecord>,
}

pub struct InputResolver {
    layout: OutputLayout,
    remote: Arc<dyn RemoteStore>,
}

impl InputResolver {
    pub fn new(layout: OutputLayout, remote: Arc<dyn RemoteStore>) -> Self {
        Self { layout, remote }
    }

    pub fn resolve(&self, reference: &str) -> Result<LocalInputSet, ResolveError> {
        let span = info_span!("resolve", input = %redact_reference(reference));
        let _enter = span.enter();

        match InputReference::parse(reference) {
            InputReference::Remote(uri) => self.download(&uri),
            InputReference::LocalArchive(path) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                let source_id = source_id_from_archive_name(name).ok_or_else(|| {
                    ResolveError::MalformedFileName {
                        name: name.to_string(),
                    }
                })?;
                info!("Using local input instead of fetching from S3");
                self.local(source_id, &path, "Processing tar.gz archive")
            }
            InputReference::LocalDirectory(path) => {
                let source_id = source_id_from_directory(&path).ok_or_else(|| {
                    ResolveError::MalformedFileName {
                        name: path.display().to_string(),
                    }
                })?;
                info!("Using extracted local input");
                self.local(source_id, &path, "Processing extracted input")
            }
        }
    }

    fn local(
        &self,
        source_id: &str,
        path: &Path,
        description: &str,
    ) -> Result<LocalInputSet, ResolveError> {
        ensure_directory(&self.layout.input_staging_dir(source_id))?;
        info!("Using source_id: {}", source_id);
        Ok(LocalInputSet {
            source_id: source_id.to_string(),
            input_file_path: path.to_path_buf(),
            status: Status::ok(format!("{}: {}", description, path.display())),
            download_provenance: None,
        })
    }

    fn download(&self, uri: &str) -> Result<LocalInputSet, ResolveError> {
        if !self.remote.validate_uri(uri) {
            return Err(ResolveError::InvalidReference {
                reference: uri.to_string(),
                reason: "expected s3://<bucket>/<object key>".to_string(),
            });
        }
        let (bucket, object_key) =
            self.remote
                .parse_uri(uri)
                .map_err(|e| ResolveError::InvalidReference {
                    reference: uri.to_string(),
                    reason: e.to_string(),
                })?;
        let source_id = source_id_from_uri(uri)
            .ok_or_else(|| ResolveError::MalformedFileName {
                name: object_key.clone(),
            })?
            .to_string();
        info!("Using source_id: {}", source_id);

        let timer = StepTimer::start();
        let staging_dir = self.layout.input_staging_dir(&source_id);
        ensure_directory(&staging_dir)?;
        let input_file_path = self.remote.download(&bucket, &object_key, &staging_dir)?;

        let provenance = timer
            .finish("download", "Download input data")
            .with_input("s3_uri", uri)
            .with_output("file_path", input_file_path.display().to_string());

        Ok(LocalInputSet {
            source_id,
            input_file_path,
            status: Status::ok(format!("Downloaded input from: {}", uri)),
            download_provenance: Some(provenance),
        })
    }
}
