//! Temporary zip archives of shared directories.
//!
//! A directory download is served by zipping the whole subtree into a file in
//! the system temp directory, streaming that file, and removing it once a
//! grace period has passed after the response finished.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::{FileError, FileResult};

/// How long a finished archive is kept around before removal.
pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(60);

/// Deflate level used for every archive entry.
const COMPRESSION_LEVEL: i64 = 9;

/// A zip file built for a single directory download.
#[derive(Debug)]
pub struct TemporaryArchive {
    path: PathBuf,
    file_name: String,
}

impl TemporaryArchive {
    /// Location of the archive on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name suggested to the client: the directory's base name plus `.zip`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Remove the archive after `delay` on a background task.
    pub fn schedule_cleanup(self, delay: Duration) -> CleanupHandle {
        let path = self.path;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            remove_archive(&path).await;
        });
        CleanupHandle { task }
    }

    /// Wrap the archive so that dropping the wrapper schedules its cleanup.
    pub fn into_guard(self, delay: Duration) -> CleanupGuard {
        CleanupGuard {
            archive: Some(self),
            delay,
        }
    }
}

/// Handle to a scheduled archive removal.
///
/// Dropping the handle does not cancel the removal.
#[derive(Debug)]
pub struct CleanupHandle {
    task: JoinHandle<()>,
}

impl CleanupHandle {
    /// Cancel the removal; the archive is left on disk.
    pub fn cancel(self) {
        self.task.abort();
    }

    /// Wait for the removal to run.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Archive cleanup task failed");
            }
        }
    }
}

/// Keeps a [`TemporaryArchive`] alive while its bytes are being streamed.
///
/// When the guard is dropped (the response body finished, failed, or the
/// client went away) the archive's removal is scheduled.
#[derive(Debug)]
pub struct CleanupGuard {
    archive: Option<TemporaryArchive>,
    delay: Duration,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let Some(archive) = self.archive.take() else {
            return;
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            debug!(path = %archive.path.display(), delay = ?self.delay, "Scheduling archive cleanup");
            archive.schedule_cleanup(self.delay);
        } else {
            // No runtime to defer on, remove right away.
            match std::fs::remove_file(&archive.path) {
                Ok(()) => info!(path = %archive.path.display(), "Removed temporary archive"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %archive.path.display(), error = %e, "Failed to remove temporary archive")
                }
            }
        }
    }
}

async fn remove_archive(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Removed temporary archive"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Temporary archive already gone");
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove temporary archive");
        }
    }
}

/// Zip `source` and everything below it into a new file under `temp_dir`.
///
/// Entries are rooted at the directory's base name, so extracting the archive
/// recreates the directory itself. The file name carries a random suffix,
/// which keeps concurrent downloads of same-named directories apart.
///
/// This does blocking I/O and should run on a blocking thread.
pub fn build_archive(source: &Path, temp_dir: &Path) -> FileResult<TemporaryArchive> {
    let base = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());

    let archive = TemporaryArchive {
        path: temp_dir.join(format!("{}-{}.zip", base, Uuid::new_v4())),
        file_name: format!("{}.zip", base),
    };

    match write_zip(source, &base, &archive.path) {
        Ok(bytes) => {
            info!(
                source = %source.display(),
                path = %archive.path.display(),
                bytes,
                "Created temporary archive"
            );
            Ok(archive)
        }
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(&archive.path) {
                if remove_err.kind() != io::ErrorKind::NotFound {
                    warn!(
                        path = %archive.path.display(),
                        error = %remove_err,
                        "Failed to remove partial archive"
                    );
                }
            }
            Err(FileError::io(
                format!("failed to archive {}", source.display()),
                e,
            ))
        }
    }
}

fn write_zip(source: &Path, base: &str, dest: &Path) -> io::Result<u64> {
    let file = File::create(dest)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let name = entry_name(base, relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            zip.add_directory(name, options)?;
        } else if file_type.is_file() {
            let len = entry.metadata().map_err(io::Error::from)?.len();
            zip.start_file(name, options.large_file(len >= u32::MAX as u64))?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut zip)?;
        } else {
            debug!(path = %entry.path().display(), "Skipping special file while archiving");
        }
    }

    let mut writer = zip.finish()?;
    io::Write::flush(&mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(file.metadata()?.len())
}

/// Zip entry name for `relative` below the archived directory.
fn entry_name(base: &str, relative: &Path) -> String {
    let mut name = base.to_string();
    for part in relative.iter() {
        name.push('/');
        name.push_str(&part.to_string_lossy());
    }
    name
}
