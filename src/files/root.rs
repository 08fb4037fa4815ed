//! The shared root directory and safe resolution of client-supplied names.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::info;

use super::error::{FileError, FileResult};

/// The directory exposed to the network.
///
/// Constructed once at startup and handed to every request handler. The path
/// is absolute and canonical; the directory itself is re-read on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedRoot {
    path: PathBuf,
}

impl SharedRoot {
    /// Open the shared root, creating the directory (and its parents) if needed.
    pub fn open(path: impl AsRef<Path>) -> FileResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                FileError::io(format!("failed to create {}", path.display()), e)
            })?;
            info!(path = %path.display(), "Created shared directory");
        }

        let path = path
            .canonicalize()
            .map_err(|e| FileError::io(format!("failed to resolve {}", path.display()), e))?;

        if !path.is_dir() {
            return Err(FileError::io(
                format!("{} is not a directory", path.display()),
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        Ok(Self { path })
    }

    /// Absolute path of the shared directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Join a client-supplied relative name onto the root.
    ///
    /// The result is always inside the root; see [`normalize_relative`].
    pub fn resolve(&self, name: &str) -> FileResult<PathBuf> {
        Ok(self.path.join(normalize_relative(name)?))
    }
}

/// Turn a client-supplied name into a relative path that cannot leave the root.
///
/// Absolute paths, drive prefixes, `..` components and NUL bytes are rejected.
/// `.` components are dropped. The check is purely lexical.
pub fn normalize_relative(name: &str) -> FileResult<PathBuf> {
    if name.contains('\0') {
        return Err(FileError::invalid_path(name, "contains a NUL byte"));
    }

    let mut clean = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(FileError::invalid_path(
                    name,
                    "parent directory components are not allowed",
                ))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(FileError::invalid_path(
                    name,
                    "absolute paths are not allowed",
                ))
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(FileError::invalid_path(name, "empty name"));
    }

    Ok(clean)
}
