//! Deriving an asset's `source_id` from archive, object or directory names.
//!
//! Input archives are named `<prefix>__<source_id>.tar.gz`. The prefix is
//! everything up to the first delimiter, so a `source_id` may itself contain
//! the delimiter (`prep__res__carrier.tar.gz` → `res__carrier`).

use std::path::Path;

use crate::storage::archive::strip_archive_extension;
use crate::storage::layout::SOURCE_ID_DELIMITER;

/// `source_id` of an archive file or object name, or `None` if the name has
/// no `<prefix>__` part or nothing after it.
pub fn source_id_from_archive_name(file_name: &str) -> Option<&str> {
    let stem = strip_archive_extension(file_name).unwrap_or(file_name);
    stem.split_once(SOURCE_ID_DELIMITER)
        .map(|(_, source_id)| source_id)
        .filter(|source_id| !source_id.is_empty())
}

/// Same as [`source_id_from_archive_name`] on the last segment of a URI.
pub fn source_id_from_uri(uri: &str) -> Option<&str> {
    uri.rsplit('/').next().and_then(source_id_from_archive_name)
}

/// An extracted directory lives in its asset's staging directory, so the
/// parent directory name is the `source_id`.
pub fn source_id_from_directory(path: &Path) -> Option<&str> {
    path.parent()
        .and_then(|parent| parent.file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
}
