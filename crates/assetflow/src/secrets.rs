//! Resolution of the S3 secret access key from its configured source.
//!
//! A secret can be given in three ways, checked in this order:
//!
//! 1. **Direct value** - convenient for local runs (`value: "..."`)
//! 2. **File reference** - Docker/Kubernetes secret mounts (`file: /run/secrets/s3`)
//! 3. **Env var reference** - (`env_var: S3_SECRET_ACCESS_KEY`)

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: value, file or env_var)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Where to find a secret. Empty strings count as "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSource {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
}

impl SecretSource {
    pub fn resolve(&self) -> Result<SecretString, SecretError> {
        if let Some(value) = non_empty(&self.value) {
            return Ok(SecretString::from(value.to_string()));
        }

        if let Some(path) = non_empty(&self.file) {
            let expanded = expand_home(path);
            let content =
                std::fs::read_to_string(&expanded).map_err(|e| SecretError::FileRead {
                    path: expanded.clone(),
                    source: e,
                })?;
            return Ok(SecretString::from(content.trim().to_string()));
        }

        if let Some(name) = non_empty(&self.env_var) {
            return match std::env::var(name) {
                Ok(value) => Ok(SecretString::from(value.trim().to_string())),
                Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                    name: name.to_string(),
                }),
                Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                    name: name.to_string(),
                }),
            };
        }

        Err(SecretError::NoSourceProvided)
    }

    /// Like [`SecretSource::resolve`], but an unconfigured source is `Ok(None)`.
    pub fn resolve_optional(&self) -> Result<Option<SecretString>, SecretError> {
        match self.resolve() {
            Ok(secret) => Ok(Some(secret)),
            Err(SecretError::NoSourceProvided) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Expands a leading `~` to the current user's home directory.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
