use std::sync::LazyLock;

use regex::Regex;

use crate::error::TransferError;

// Bucket names follow the S3 naming rules; the key must be non-empty.
static RE_S3_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^s3://([a-z0-9][a-z0-9.\-]{1,61}[a-z0-9])/([^/].*)$").unwrap()
});

pub fn validate_s3_uri(uri: &str) -> bool {
    RE_S3_URI.is_match(uri)
}

/// Parses `s3://bucket/key/path` into `(bucket, key)`.
pub fn parse_s3_uri(uri: &str) -> Result<(String, String), TransferError> {
    let invalid = |reason: &str| TransferError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    if !uri.starts_with("s3://") {
        return Err(invalid("expected 's3://' prefix"));
    }

    let captures = RE_S3_URI
        .captures(uri)
        .ok_or_else(|| invalid("expected 's3://bucket/key' format"))?;

    Ok((captures[1].to_string(), captures[2].to_string()))
}

pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key.trim_start_matches('/'))
}
