//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Input references can carry full mount paths or presigned query strings;
//! spans only ever get the object or file name.

/// Reduces an input reference (URI or local path) to its final segment,
/// dropping any query string.
///
/// - `s3://bucket/assets/prep__a__b.tar.gz?X-Amz-Signature=..` → `prep__a__b.tar.gz`
/// - `/mnt/data/input-files/prep__a__b.tar.gz` → `prep__a__b.tar.gz`
pub fn redact_reference(reference: &str) -> String {
    let without_query = reference.split(['?', '#']).next().unwrap_or(reference);
    let without_scheme = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    match without_scheme.trim_end_matches('/').rsplit('/').next() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => "<unknown>".to_string(),
    }
}
