//! Storing uploaded files in the shared root.

use std::io;
use std::pin::pin;

use futures_util::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{FileError, FileResult};
use super::root::SharedRoot;

/// A file that was written to the shared root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: u64,
}

/// Reduce a client-supplied filename to a plain name in the shared root.
///
/// Browsers may send a full path; only the last component is kept, using
/// either `/` or `\` as separator.
pub fn sanitize_upload_name(raw: &str) -> FileResult<String> {
    if raw.contains('\0') {
        return Err(FileError::invalid_path(raw, "contains a NUL byte"));
    }

    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    match name {
        "" => Err(FileError::invalid_path(raw, "empty file name")),
        "." | ".." => Err(FileError::invalid_path(raw, "reserved file name")),
        _ => Ok(name.to_string()),
    }
}

/// Stream an upload into the shared root under its sanitized name.
///
/// Bytes go to a hidden sibling `.<name>.<uuid>.part` first, which is renamed
/// over the target once the stream ends. An existing file with the same name
/// is replaced only by a complete upload; on failure just the part file is
/// removed. An existing symlink under that name is replaced, not written
/// through.
pub async fn save_upload<S, B, E>(
    root: &SharedRoot,
    raw_name: &str,
    chunks: S,
) -> FileResult<UploadedFile>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let name = sanitize_upload_name(raw_name)?;
    let path = root.path().join(&name);
    let part_path = root.path().join(part_file_name(&name));

    let mut file = fs::File::create(&part_path)
        .await
        .map_err(|e| FileError::io(format!("failed to create {}", part_path.display()), e))?;

    let mut chunks = pin!(chunks);
    let mut bytes = 0u64;
    let copied: io::Result<()> = async {
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(io::Error::other)?;
            let data = chunk.as_ref();
            file.write_all(data).await?;
            bytes += data.len() as u64;
        }
        file.flush().await
    }
    .await;
    drop(file);

    let stored = match copied {
        Ok(()) => fs::rename(&part_path, &path)
            .await
            .map_err(|e| FileError::io(format!("failed to store {}", path.display()), e)),
        Err(e) => Err(FileError::io(format!("failed to write {}", path.display()), e)),
    };

    if let Err(e) = stored {
        if let Err(remove_err) = fs::remove_file(&part_path).await {
            warn!(name = %name, error = %remove_err, "Failed to remove partial upload");
        }
        return Err(e);
    }

    info!(name = %name, bytes, "Stored upload");
    Ok(UploadedFile { name, bytes })
}

fn part_file_name(name: &str) -> String {
    format!(".{}.{}.part", name, Uuid::new_v4())
}
