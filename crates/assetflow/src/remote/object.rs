//! [`RemoteStore`] backed by the `object_store` crate.
//!
//! Two backends: S3 (or an S3-compatible endpoint such as MinIO), and a
//! local directory where each bucket is a subdirectory. The pipeline is
//! synchronous, so every call runs on a private current-thread runtime;
//! these methods must not be called from inside another tokio runtime.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::buffered::BufWriter;
use object_store::{BackoffConfig, ClientOptions, ObjectStore, RetryConfig};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::S3Credentials;
use crate::error::TransferError;
use crate::remote::{s3_uri, RemoteStore};
use crate::secrets::SecretError;
use crate::storage::archive;

fn client_options() -> ClientOptions {
    ClientOptions::new()
        .with_connect_timeout(Duration::from_secs(5))
        .with_timeout(Duration::from_secs(300))
        .with_pool_idle_timeout(Duration::from_secs(90))
}

// Retries 429 and 5xx responses with exponential backoff.
fn retry_config() -> RetryConfig {
    RetryConfig {
        max_retries: 5,
        backoff: BackoffConfig {
            init_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            base: 2.0,
        },
        retry_timeout: Duration::from_secs(180),
    }
}

/// Connection settings for the S3 backend.
#[derive(Debug, Default)]
pub struct S3Settings {
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub region: Option<String>,
}

impl S3Settings {
    pub fn from_config(
        endpoint: Option<&str>,
        credentials: &S3Credentials,
    ) -> Result<Self, SecretError> {
        Ok(Self {
            endpoint: endpoint.filter(|e| !e.is_empty()).map(String::from),
            access_key_id: credentials.access_key_id.clone(),
            secret_access_key: credentials.secret_access_key.resolve_optional()?,
            region: credentials.region.clone(),
        })
    }

    fn build(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, object_store::Error> {
        // Anything not set explicitly comes from AWS_* environment variables.
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_client_options(client_options())
            .with_retry(retry_config());

        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"))
                .with_virtual_hosted_style_request(false);
        }
        if let Some(key_id) = &self.access_key_id {
            builder = builder.with_access_key_id(key_id);
        }
        if let Some(secret) = &self.secret_access_key {
            builder = builder.with_secret_access_key(secret.expose_secret());
        }
        if let Some(region) = &self.region {
            builder = builder.with_region(region);
        }

        Ok(Arc::new(builder.build()?))
    }
}

enum Backend {
    S3(S3Settings),
    Local(PathBuf),
}

pub struct ObjectStoreRemote {
    backend: Backend,
    runtime: tokio::runtime::Runtime,
    buckets: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreRemote {
    pub fn s3(settings: S3Settings) -> Result<Self, TransferError> {
        Self::with_backend(Backend::S3(settings))
    }

    /// Mirrors buckets as subdirectories of `root`.
    pub fn local<P: AsRef<Path>>(root: P) -> Result<Self, TransferError> {
        Self::with_backend(Backend::Local(root.as_ref().to_path_buf()))
    }

    fn with_backend(backend: Backend) -> Result<Self, TransferError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransferError::Runtime)?;
        Ok(Self {
            backend,
            runtime,
            buckets: Mutex::new(HashMap::new()),
        })
    }

    fn bucket(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>, TransferError> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(store) = buckets.get(bucket) {
            return Ok(Arc::clone(store));
        }

        let store = match &self.backend {
            Backend::S3(settings) => {
                info!("Creating S3 client for bucket: {}", bucket);
                settings.build(bucket)
            }
            Backend::Local(root) => {
                let dir = root.join(bucket);
                std::fs::create_dir_all(&dir).map_err(|e| TransferError::LocalIo {
                    path: dir.clone(),
                    source: e,
                })?;
                debug!("Using local bucket directory: {}", dir.display());
                LocalFileSystem::new_with_prefix(&dir)
                    .map(|fs| Arc::new(fs) as Arc<dyn ObjectStore>)
            }
        }
        .map_err(|e| TransferError::Connect {
            bucket: bucket.to_string(),
            source: e,
        })?;

        buckets.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

impl RemoteStore for ObjectStoreRemote {
    fn download(
        &self,
        bucket: &str,
        object_key: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, TransferError> {
        let file_name = object_key
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| TransferError::InvalidUri {
                uri: s3_uri(bucket, object_key),
                reason: "object key has no file name".to_string(),
            })?;

        std::fs::create_dir_all(dest_dir).map_err(|e| TransferError::LocalIo {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;
        let destination = dest_dir.join(file_name);

        let store = self.bucket(bucket)?;
        let location = ObjectPath::from(object_key);
        let download_error = |source: object_store::Error| TransferError::Download {
            bucket: bucket.to_string(),
            key: object_key.to_string(),
            source,
        };
        let local_error = |source: std::io::Error| TransferError::LocalIo {
            path: destination.clone(),
            source,
        };

        info!("Downloading {}", s3_uri(bucket, object_key));
        let result = self.runtime.block_on(async {
            let mut stream = store
                .get(&location)
                .await
                .map_err(download_error)?
                .into_stream();
            let mut file = tokio::fs::File::create(&destination)
                .await
                .map_err(local_error)?;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(download_error)?;
                file.write_all(&chunk).await.map_err(local_error)?;
            }
            file.flush().await.map_err(local_error)?;
            Ok::<(), TransferError>(())
        });

        if let Err(e) = result {
            if destination.exists() {
                if let Err(cleanup) = std::fs::remove_file(&destination) {
                    warn!("Failed to remove partial download: {}", cleanup);
                }
            }
            return Err(e);
        }

        Ok(destination)
    }

    fn upload(
        &self,
        bucket: &str,
        key_prefix: &str,
        source_paths: &[PathBuf],
        archive_path: &Path,
    ) -> Result<String, TransferError> {
        archive::compress_dirs(source_paths, archive_path)?;

        let file_name = archive_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::LocalIo {
                path: archive_path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "archive path has no file name",
                ),
            })?;
        let key = match key_prefix.trim_matches('/') {
            "" => file_name.to_string(),
            prefix => format!("{}/{}", prefix, file_name),
        };

        let store = self.bucket(bucket)?;
        let upload_error = |source: std::io::Error| TransferError::Upload {
            bucket: bucket.to_string(),
            key: key.clone(),
            source,
        };

        info!("Uploading {} to {}", file_name, s3_uri(bucket, &key));
        self.runtime.block_on(async {
            let mut file = tokio::fs::File::open(archive_path)
                .await
                .map_err(|e| TransferError::LocalIo {
                    path: archive_path.to_path_buf(),
                    source: e,
                })?;
            // Small archives go up in one put, larger ones as a multipart upload
            let mut writer = BufWriter::new(store, ObjectPath::from(key.as_str()));
            let copied = match tokio::io::copy(&mut file, &mut writer).await {
                Ok(copied) => copied,
                Err(e) => {
                    if let Err(abort) = writer.abort().await {
                        warn!("Failed to abort upload of {}: {}", key, abort);
                    }
                    return Err(upload_error(e));
                }
            };
            writer.shutdown().await.map_err(upload_error)?;
            debug!("Uploaded {} bytes", copied);
            Ok::<(), TransferError>(())
        })?;

        Ok(key)
    }
}
