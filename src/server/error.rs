//! Mapping of request failures to HTTP responses.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use crate::files::FileError;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("malformed upload: {0}")]
    Upload(#[from] MultipartError),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::File(FileError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::File(FileError::Unsupported { .. }) => StatusCode::BAD_REQUEST,
            AppError::File(FileError::InvalidPath { .. }) => StatusCode::BAD_REQUEST,
            AppError::File(FileError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short message shown to the client.
    fn public_message(&self) -> &'static str {
        match self {
            AppError::File(FileError::NotFound { .. }) => "Not found",
            AppError::File(FileError::Unsupported { .. }) => "Unsupported entry type",
            AppError::File(FileError::InvalidPath { .. }) => "Invalid path",
            AppError::File(FileError::Io { .. }) | AppError::Template(_) => "Internal server error",
            AppError::Upload(_) => "Malformed upload",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, self.public_message()).into_response()
    }
}
