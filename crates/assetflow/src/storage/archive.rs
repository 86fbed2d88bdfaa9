//! tar.gz handling: unpacking input archives and packing output for upload.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::storage::layout::ARCHIVE_EXTENSION;

/// Returns the file name without its `.tar.gz` suffix, or `None` if the
/// name does not carry the suffix.
pub fn strip_archive_extension(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(ARCHIVE_EXTENSION)
        .filter(|stem| !stem.is_empty())
}

pub fn is_archive(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(strip_archive_extension)
        .is_some()
}

fn archive_error(path: &Path, source: io::Error) -> StorageError {
    StorageError::Archive {
        path: path.to_path_buf(),
        source,
    }
}

/// Unpacks `path` into a directory under `dest_dir` named after the archive
/// (`prep__a__b.tar.gz` → `<dest_dir>/prep__a__b/`) and returns that
/// directory.
///
/// Safe to call repeatedly: a directory argument is returned as-is, and an
/// archive whose target directory already exists is not unpacked again.
pub fn extract(path: &Path, dest_dir: &Path) -> Result<PathBuf, StorageError> {
    if path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(strip_archive_extension)
        .ok_or_else(|| {
            archive_error(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a .tar.gz archive"),
            )
        })?;
    let target = dest_dir.join(stem);

    if target.is_dir() {
        debug!("Archive already extracted at {}", target.display());
        return Ok(target);
    }

    info!("Uncompressing {}", path.display());
    let file = File::open(path).map_err(|e| archive_error(path, e))?;
    std::fs::create_dir_all(&target).map_err(|e| StorageError::CreateDirectory {
        path: target.clone(),
        source: e,
    })?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    if let Err(e) = archive.unpack(&target) {
        // Leave no half-extracted directory behind, or the next call would
        // mistake it for a finished extraction.
        if let Err(cleanup) = std::fs::remove_dir_all(&target) {
            warn!(
                "Failed to remove partial extraction {}: {}",
                target.display(),
                cleanup
            );
        }
        return Err(archive_error(path, e));
    }

    Ok(target)
}

/// Packs each source path (directory or file) into a single gzip'ed tar at
/// `archive_path`, each under its own file name.
pub fn compress_dirs(source_paths: &[PathBuf], archive_path: &Path) -> Result<(), StorageError> {
    let file = File::create(archive_path).map_err(|e| StorageError::WriteFile {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for source in source_paths {
        let name = source.file_name().ok_or_else(|| {
            archive_error(
                source,
                io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name"),
            )
        })?;

        if source.is_dir() {
            builder
                .append_dir_all(name, source)
                .map_err(|e| archive_error(source, e))?;
        } else if source.is_file() {
            builder
                .append_path_with_name(source, name)
                .map_err(|e| archive_error(source, e))?;
        } else {
            return Err(archive_error(
                source,
                io::Error::new(io::ErrorKind::NotFound, "nothing to archive"),
            ));
        }
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| archive_error(archive_path, e))?;

    debug!(
        "Packed {} path(s) into {}",
        source_paths.len(),
        archive_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_archive(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (entry_name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, entry_name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn test_strip_archive_extension() {
        assert_eq!(
            strip_archive_extension("prep__a__b.tar.gz"),
            Some("prep__a__b")
        );
        assert_eq!(strip_archive_extension("prep__a__b.zip"), None);
        assert_eq!(strip_archive_extension(".tar.gz"), None);
    }

    #[test]
    fn test_extract_unpacks_into_destination() {
        let temp_dir = TempDir::new().unwrap();
        let archive = write_archive(
            temp_dir.path(),
            "prep__a__b.tar.gz",
            &[("a__b.input", "one two three\n")],
        );
        let staging = temp_dir.path().join("input-files/a__b");

        let extracted = extract(&archive, &staging).unwrap();

        assert_eq!(extracted, staging.join("prep__a__b"));
        assert!(!temp_dir.path().join("prep__a__b").exists());
        assert_eq!(
            std::fs::read_to_string(extracted.join("a__b.input")).unwrap(),
            "one two three\n"
        );
    }

    #[test]
    fn test_extract_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let archive = write_archive(temp_dir.path(), "x__y.tar.gz", &[("y.input", "a b")]);

        let first = extract(&archive, temp_dir.path()).unwrap();
        std::fs::write(first.join("marker"), b"untouched").unwrap();
        let second = extract(&archive, temp_dir.path()).unwrap();

        assert_eq!(first, second);
        assert!(second.join("marker").exists());
    }

    #[test]
    fn test_extract_directory_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(extract(temp_dir.path(), temp_dir.path()).unwrap(), temp_dir.path());
    }

    #[test]
    fn test_extract_rejects_non_archive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, b"plain").unwrap();

        assert!(matches!(extract(&path, temp_dir.path()), Err(StorageError::Archive { .. })));
    }

    #[test]
    fn test_extract_corrupt_archive_leaves_no_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken__x.tar.gz");
        std::fs::write(&path, b"definitely not gzip").unwrap();

        assert!(extract(&path, temp_dir.path()).is_err());
        assert!(!temp_dir.path().join("broken__x").exists());
    }

    #[test]
    fn test_compress_dirs_round_trips_through_extract() {
        let temp_dir = TempDir::new().unwrap();
        let provenance = temp_dir.path().join("provenance");
        std::fs::create_dir_all(&provenance).unwrap();
        std::fs::write(provenance.join("provenance.json"), b"[]").unwrap();

        let archive = temp_dir.path().join("base_name__a__b.tar.gz");
        compress_dirs(&[provenance], &archive).unwrap();

        let extracted = extract(&archive, temp_dir.path()).unwrap();
        assert!(extracted.join("provenance/provenance.json").exists());
    }

    #[test]
    fn test_compress_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let archive = temp_dir.path().join("out.tar.gz");
        let result = compress_dirs(&[temp_dir.path().join("missing")], &archive);
        assert!(matches!(result, Err(StorageError::Archive { .. })));
    }
}
