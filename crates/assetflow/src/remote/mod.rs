//! The object-storage collaborator: the pipeline only ever validates and
//! parses `s3://` URIs, downloads one object, and uploads one archive.

pub mod object;
pub mod uri;

use std::path::{Path, PathBuf};

use crate::error::TransferError;

pub use object::{ObjectStoreRemote, S3Settings};
pub use uri::{parse_s3_uri, s3_uri, validate_s3_uri};

pub trait RemoteStore: Send + Sync {
    fn validate_uri(&self, uri: &str) -> bool {
        validate_s3_uri(uri)
    }

    /// Splits a URI into `(bucket, object_key)`.
    fn parse_uri(&self, uri: &str) -> Result<(String, String), TransferError> {
        parse_s3_uri(uri)
    }

    /// Downloads `bucket/object_key` into `dest_dir`, keeping the object's
    /// file name, and returns the local path.
    fn download(
        &self,
        bucket: &str,
        object_key: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, TransferError>;

    /// Packs `source_paths` into `archive_path` and uploads the archive to
    /// `bucket/key_prefix/<archive file name>`. Returns the object key.
    fn upload(
        &self,
        bucket: &str,
        key_prefix: &str,
        source_paths: &[PathBuf],
        archive_path: &Path,
    ) -> Result<String, TransferError>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! Call-recording [`RemoteStore`] for unit tests.

    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use super::RemoteStore;
    use crate::error::TransferError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Download { bucket: String, key: String },
        Upload { bucket: String, key_prefix: String, sources: Vec<PathBuf> },
    }

    /// Serves every download with `payload` and accepts every upload,
    /// unless told to fail.
    #[derive(Default)]
    pub struct FakeStore {
        pub payload: Vec<u8>,
        pub fail_download: bool,
        pub fail_upload: bool,
        pub calls: Mutex<Vec<Call>>,
    }

    impl FakeStore {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn uploads(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Upload { .. }))
                .count()
        }

        fn io_error(path: &Path) -> TransferError {
            TransferError::LocalIo {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "simulated failure"),
            }
        }
    }

    impl RemoteStore for FakeStore {
        fn download(
            &self,
            bucket: &str,
            object_key: &str,
            dest_dir: &Path,
        ) -> Result<PathBuf, TransferError> {
            self.calls.lock().unwrap().push(Call::Download {
                bucket: bucket.to_string(),
                key: object_key.to_string(),
            });
            if self.fail_download {
                return Err(Self::io_error(dest_dir));
            }
            let name = object_key.rsplit('/').next().unwrap_or(object_key);
            let path = dest_dir.join(name);
            std::fs::write(&path, &self.payload).map_err(|e| TransferError::LocalIo {
                path: path.clone(),
                source: e,
            })?;
            Ok(path)
        }

        fn upload(
            &self,
            bucket: &str,
            key_prefix: &str,
            source_paths: &[PathBuf],
            archive_path: &Path,
        ) -> Result<String, TransferError> {
            self.calls.lock().unwrap().push(Call::Upload {
                bucket: bucket.to_string(),
                key_prefix: key_prefix.to_string(),
                sources: source_paths.to_vec(),
            });
            if self.fail_upload {
                return Err(Self::io_error(archive_path));
            }
            let name = archive_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            Ok(format!("{}/{}", key_prefix, name))
        }
    }
}
