//! Error types for operations on the shared directory.

use thiserror::Error;

/// Errors that can occur while serving files from the shared root.
#[derive(Debug, Error)]
pub enum FileError {
    /// The requested entry does not exist.
    #[error("not found: {name}")]
    NotFound { name: String },

    /// The entry exists but is neither a regular file nor a directory.
    #[error("unsupported entry type: {name}")]
    Unsupported { name: String },

    /// The client-supplied name is not acceptable.
    #[error("invalid path {name:?}: {reason}")]
    InvalidPath { name: String, reason: &'static str },

    /// An I/O operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an unsupported entry error.
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::Unsupported { name: name.into() }
    }

    /// Create an invalid path error.
    pub fn invalid_path(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            name: name.into(),
            reason,
        }
    }

    /// Create an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for file operations.
pub type FileResult<T> = Result<T, FileError>;
