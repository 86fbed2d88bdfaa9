//! Removal of local input and output once an asset has been dealt with.

use std::path::{Component, Path};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::storage::layout::OutputType;

/// True for paths that must never be removed recursively: empty, the
/// current directory, or a filesystem root.
fn is_protected(path: &Path) -> bool {
    let components: Vec<Component> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    match components.as_slice() {
        [] => true,
        [Component::RootDir] | [Component::Prefix(_)] | [Component::Prefix(_), Component::RootDir] => {
            true
        }
        _ => false,
    }
}

/// Deletes an asset's output directory, but only if it looks like one:
/// every `required` output subdirectory must be present.
pub fn delete_local_output(output_dir: &Path, required: &[OutputType]) -> Result<(), StorageError> {
    info!("Deleting output folder: {}", output_dir.display());

    if is_protected(output_dir) {
        return Err(StorageError::RefusedDeletion {
            path: output_dir.to_path_buf(),
            reason: "path is the filesystem root or the current directory".to_string(),
        });
    }

    let missing: Vec<&str> = required
        .iter()
        .filter(|t| !output_dir.join(t.dir_name()).is_dir())
        .map(|t| t.dir_name())
        .collect();
    if !missing.is_empty() {
        return Err(StorageError::RefusedDeletion {
            path: output_dir.to_path_buf(),
            reason: format!(
                "directory does not contain expected output ({})",
                missing.join(", ")
            ),
        });
    }

    std::fs::remove_dir_all(output_dir).map_err(|e| StorageError::RemoveDirectory {
        path: output_dir.to_path_buf(),
        source: e,
    })?;
    info!("Cleaned up folder {}", output_dir.display());
    Ok(())
}

/// Deletes the input (archive file or extracted directory), then whatever
/// was extracted into the staging directory, then the staging directory.
///
/// A directory input is only removed when it lies below `download_dir`.
/// Only the removal of `input_path` itself is fatal. Problems with the
/// staging directory are returned as warnings.
pub fn delete_input(
    input_path: &Path,
    staging_dir: &Path,
    download_dir: &Path,
) -> Result<Vec<StorageError>, StorageError> {
    let removal = if input_path.is_dir() {
        if is_protected(input_path)
            || input_path == download_dir
            || !input_path.starts_with(download_dir)
        {
            return Err(StorageError::RefusedDeletion {
                path: input_path.to_path_buf(),
                reason: format!(
                    "input directory is not inside the download dir {}",
                    download_dir.display()
                ),
            });
        }
        std::fs::remove_dir_all(input_path).map_err(|e| StorageError::RemoveDirectory {
            path: input_path.to_path_buf(),
            source: e,
        })
    } else {
        std::fs::remove_file(input_path).map_err(|e| StorageError::RemoveFile {
            path: input_path.to_path_buf(),
            source: e,
        })
    };
    removal?;
    info!("Deleted input: {}", input_path.display());

    let mut warnings = Vec::new();
    if !staging_dir.is_dir() {
        return Ok(warnings);
    }

    for entry in WalkDir::new(staging_dir).min_depth(1).max_depth(1) {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => {
                info!("Deleting {}", entry.path().display());
                if let Err(e) = std::fs::remove_dir_all(entry.path()) {
                    warnings.push(StorageError::RemoveDirectory {
                        path: entry.path().to_path_buf(),
                        source: e,
                    });
                }
            }
            Ok(_) => {}
            Err(e) => warnings.push(StorageError::RemoveDirectory {
                path: staging_dir.to_path_buf(),
                source: e.into(),
            }),
        }
    }

    match std::fs::remove_dir(staging_dir) {
        Ok(()) => info!("Deleted staging dir: {}", staging_dir.display()),
        Err(e) => warnings.push(StorageError::RemoveDirectory {
            path: staging_dir.to_path_buf(),
            source: e,
        }),
    }

    for warning in &warnings {
        warn!("Input cleanup incomplete: {}", warning);
    }
    Ok(warnings)
}
