//! Listing of the shared root's immediate entries.

use std::cmp::Ordering;
use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use super::error::{FileError, FileResult};
use super::root::SharedRoot;

/// One immediate child of the shared root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File name, a single path component.
    pub name: String,
    /// Size in bytes as reported by the file system.
    pub size_bytes: u64,
    /// Whether the entry is a directory (symlinks are followed).
    pub is_directory: bool,
}

impl Entry {
    /// Human-readable size, see [`format_size`].
    pub fn display_size(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Read the immediate entries of the shared root.
///
/// Directories come first, then files, each group sorted by name. Entries
/// whose metadata cannot be read (dangling symlinks, races with deletion) are
/// skipped.
pub async fn list_entries(root: &SharedRoot) -> FileResult<Vec<Entry>> {
    list_dir(root.path()).await
}

async fn list_dir(dir: &Path) -> FileResult<Vec<Entry>> {
    let read_error = |e| FileError::io(format!("failed to read {}", dir.display()), e);

    let mut reader = fs::read_dir(dir).await.map_err(read_error)?;
    let mut entries = Vec::new();

    while let Some(dir_entry) = reader.next_entry().await.map_err(read_error)? {
        let name = dir_entry.file_name().to_string_lossy().into_owned();

        // fs::metadata follows symlinks, so a link to a directory lists as one.
        match fs::metadata(dir_entry.path()).await {
            Ok(meta) => entries.push(Entry {
                name,
                size_bytes: meta.len(),
                is_directory: meta.is_dir(),
            }),
            Err(e) => {
                warn!(name = %name, error = %e, "Skipping entry with unreadable metadata");
            }
        }
    }

    entries.sort_by(compare_entries);
    debug!(path = %dir.display(), count = entries.len(), "Listed shared directory");
    Ok(entries)
}

fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.name.cmp(&b.name))
}

/// Format a byte count for display.
///
/// Below 1 KiB the exact count is shown, below 1 MiB two-decimal kilobytes,
/// everything else two-decimal megabytes. There is no gigabyte tier.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}
