//! Deletion of shared files.

use std::io;

use tokio::fs;
use tracing::{info, warn};

use super::error::{FileError, FileResult};
use super::root::SharedRoot;

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The file was removed.
    Removed,
    /// Nothing existed under that name.
    Missing,
    /// The name refers to a directory, which is never deleted.
    RefusedDirectory,
}

/// Delete a single file under the shared root.
///
/// Missing names succeed without doing anything. Directories are left alone.
/// A symlink is removed as a link, its target is untouched.
pub async fn delete_entry(root: &SharedRoot, name: &str) -> FileResult<DeleteOutcome> {
    let path = root.resolve(name)?;

    let meta = match fs::symlink_metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(DeleteOutcome::Missing),
        Err(e) => {
            return Err(FileError::io(
                format!("failed to stat {}", path.display()),
                e,
            ))
        }
    };

    if meta.is_dir() {
        warn!(name = %name, "Refusing to delete a directory");
        return Ok(DeleteOutcome::RefusedDirectory);
    }

    match fs::remove_file(&path).await {
        Ok(()) => {
            info!(name = %name, "Deleted file");
            Ok(DeleteOutcome::Removed)
        }
        // Lost a race with another delete.
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(DeleteOutcome::Missing),
        Err(e) => Err(FileError::io(
            format!("failed to delete {}", path.display()),
            e,
        )),
    }
}
