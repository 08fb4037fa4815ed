//! Resolution of download requests.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use super::archive::{build_archive, TemporaryArchive};
use super::error::{FileError, FileResult};
use super::root::SharedRoot;

/// What to send back for a download request.
#[derive(Debug)]
pub enum Download {
    /// A regular file, streamed as-is.
    File {
        path: PathBuf,
        file_name: String,
        len: u64,
    },
    /// A directory, zipped into a temporary archive.
    Archive(TemporaryArchive),
}

impl Download {
    /// Name suggested to the client for saving.
    pub fn file_name(&self) -> &str {
        match self {
            Download::File { file_name, .. } => file_name,
            Download::Archive(archive) => archive.file_name(),
        }
    }
}

/// Resolve `name` under the shared root and prepare it for download.
///
/// Directories are archived on the blocking thread pool into `temp_dir`.
pub async fn prepare_download(
    root: &SharedRoot,
    name: &str,
    temp_dir: &Path,
) -> FileResult<Download> {
    let path = root.resolve(name)?;

    let meta = match fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(name = %name, "Requested entry not found");
            return Err(FileError::not_found(name));
        }
        Err(e) => {
            return Err(FileError::io(
                format!("failed to stat {}", path.display()),
                e,
            ))
        }
    };

    if meta.is_file() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        debug!(name = %name, bytes = meta.len(), "Serving file");
        Ok(Download::File {
            path,
            file_name,
            len: meta.len(),
        })
    } else if meta.is_dir() {
        debug!(name = %name, "Archiving directory");
        let temp_dir = temp_dir.to_path_buf();
        let archive = tokio::task::spawn_blocking(move || build_archive(&path, &temp_dir))
            .await
            .map_err(|e| FileError::io("archive task failed", io::Error::other(e)))??;
        Ok(Download::Archive(archive))
    } else {
        warn!(name = %name, "Requested entry is neither a file nor a directory");
        Err(FileError::unsupported(name))
    }
}
