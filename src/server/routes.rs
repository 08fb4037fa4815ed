//! HTTP routes for the file manager.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use futures_util::StreamExt;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::assets::{content_type, StaticAssets};
use super::error::AppError;
use super::templates::TemplateEngine;
use crate::files::{
    delete_entry, list_entries, prepare_download, save_upload, DeleteOutcome, Download,
    FileError, SharedRoot, DEFAULT_CLEANUP_DELAY,
};
use crate::net::{list_addresses, server_urls};

/// Multipart field carrying uploaded files.
pub const UPLOAD_FIELD: &str = "files";

/// Shared application state.
pub struct AppState {
    /// Directory being shared.
    pub root: SharedRoot,
    pub template_engine: TemplateEngine,
    /// Port shown in the advertised URLs.
    pub port: u16,
    /// Where directory archives are written.
    pub temp_dir: PathBuf,
    /// How long an archive outlives its download.
    pub cleanup_delay: Duration,
    /// Source of the addresses shown on the page.
    pub discover_addresses: fn() -> Vec<String>,
}

impl AppState {
    /// State with the default temp directory, cleanup delay and address discovery.
    pub fn new(root: SharedRoot, port: u16) -> Self {
        Self {
            root,
            template_engine: TemplateEngine::default(),
            port,
            temp_dir: std::env::temp_dir(),
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
            discover_addresses: list_addresses,
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::disable()),
        )
        .route("/download/*name", get(download_handler))
        .route("/delete/*name", get(delete_handler))
        .route("/assets/*path", get(assets_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for the listing page.
async fn index_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let entries = list_entries(&state.root).await?;
    // Interface enumeration is a blocking syscall.
    let addresses = tokio::task::spawn_blocking(state.discover_addresses)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "Address discovery failed");
            Vec::new()
        });
    let urls = server_urls(&addresses, state.port);
    let html = state.template_engine.render_index(&entries, &urls)?;
    Ok(Html(html))
}

/// Handler for multipart uploads.
///
/// Every part of the `files` field is stored under its own file name. Parts
/// with an unusable name are skipped.
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!(field = ?field.name(), "Ignoring unexpected form field");
            continue;
        }

        // Browsers send an empty file name when nothing was selected.
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        match save_upload(&state.root, &file_name, field).await {
            Ok(_) => {}
            Err(e @ FileError::InvalidPath { .. }) => {
                warn!(name = %file_name, error = %e, "Skipping upload with unusable name");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Redirect::to("/"))
}

/// Handler for downloads: files are streamed, directories zipped first.
async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    match prepare_download(&state.root, &name, &state.temp_dir).await? {
        Download::File {
            path,
            file_name,
            len,
        } => {
            let file = File::open(&path)
                .await
                .map_err(|e| FileError::io(format!("failed to open {}", path.display()), e))?;
            let stream = ReaderStream::new(file).map(move |chunk| {
                if let Err(ref e) = chunk {
                    warn!(path = %path.display(), error = %e, "File stream aborted");
                }
                chunk
            });
            Ok(attachment(
                &content_type(&file_name),
                &file_name,
                Some(len),
                Body::from_stream(stream),
            ))
        }
        Download::Archive(archive) => {
            let path = archive.path().to_path_buf();
            let file_name = archive.file_name().to_string();
            // Removal is scheduled once the guard drops: after the body
            // finished, failed, or was never sent.
            let guard = archive.into_guard(state.cleanup_delay);

            let file = File::open(&path)
                .await
                .map_err(|e| FileError::io(format!("failed to open {}", path.display()), e))?;
            let len = file.metadata().await.ok().map(|meta| meta.len());

            info!(name = %name, archive = %path.display(), "Sending directory archive");
            let stream = ReaderStream::new(file).map(move |chunk| {
                let _guard = &guard;
                if let Err(ref e) = chunk {
                    warn!(path = %path.display(), error = %e, "Archive stream aborted");
                }
                chunk
            });
            Ok(attachment(
                "application/zip",
                &file_name,
                len,
                Body::from_stream(stream),
            ))
        }
    }
}

/// Handler for deletions. Always returns to the listing except for rejected names.
async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Redirect, AppError> {
    match delete_entry(&state.root, &name).await {
        Ok(DeleteOutcome::Removed) => {}
        Ok(DeleteOutcome::Missing) => debug!(name = %name, "Nothing to delete"),
        Ok(DeleteOutcome::RefusedDirectory) => {}
        Err(e @ FileError::InvalidPath { .. }) => return Err(e.into()),
        Err(e) => warn!(name = %name, error = %e, "Delete failed"),
    }
    Ok(Redirect::to("/"))
}

/// Handler for static assets.
async fn assets_handler(Path(path): Path<String>) -> Response {
    match StaticAssets::get(&path) {
        Some(file) => (
            [(header::CONTENT_TYPE, content_type(&path))],
            file.data.into_owned(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Build a download response with a `Content-Disposition: attachment` header.
fn attachment(mime: &str, file_name: &str, len: Option<u64>, body: Body) -> Response {
    let mut response = body.into_response();
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(mime) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(len) = len {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    if let Ok(value) = HeaderValue::from_str(&content_disposition(file_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    response
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(file_name, NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn fixed_addresses() -> Vec<String> {
        vec!["192.168.1.20".to_string(), "127.0.0.1".to_string()]
    }

    fn create_test_state() -> (TempDir, Arc<AppState>) {
        let tmp = TempDir::new().unwrap();
        let root = SharedRoot::open(tmp.path().join("share")).unwrap();
        let temp_dir = tmp.path().join("archives");
        std::fs::create_dir(&temp_dir).unwrap();

        let state = AppState {
            temp_dir,
            cleanup_delay: Duration::from_millis(50),
            discover_addresses: fixed_addresses,
            ..AppState::new(root, 3001)
        };
        (tmp, Arc::new(state))
    }

    async fn send(state: &Arc<AppState>, uri: &str) -> Response {
        build_router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\"; filename*=UTF-8''report%2Epdf"
        );
    }

    #[test]
    fn test_content_disposition_unicode_and_quotes() {
        let value = content_disposition("отчёт \"v2\".txt");
        assert!(value.starts_with("attachment; filename=\"_____ _v2_.txt\""));
        assert!(value.contains("filename*=UTF-8''%D0%BE"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[tokio::test]
    async fn test_index_returns_html() {
        let (_tmp, state) = create_test_state();
        std::fs::write(state.root.path().join("hello.txt"), b"hi").unwrap();

        let response = send(&state, "/").await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/html"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("hello.txt"));
        assert!(html.contains("192.168.1.20:3001"));
    }

    #[tokio::test]
    async fn test_index_discovers_addresses_per_request() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn counting_addresses() -> Vec<String> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            vec!["10.0.0.7".to_string()]
        }

        let (_tmp, state) = create_test_state();
        let state = Arc::new(AppState {
            discover_addresses: counting_addresses,
            ..Arc::try_unwrap(state).ok().unwrap()
        });

        for _ in 0..2 {
            let response = send(&state, "/").await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert!(String::from_utf8(body.to_vec())
                .unwrap()
                .contains("http://10.0.0.7:3001"));
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_index_fails_when_root_missing() {
        let (_tmp, state) = create_test_state();
        std::fs::remove_dir(state.root.path()).unwrap();

        let response = send(&state, "/").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_download_file_headers() {
        let (_tmp, state) = create_test_state();
        std::fs::write(state.root.path().join("notes.txt"), b"hello").unwrap();

        let response = send(&state, "/download/notes.txt").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::CONTENT_LENGTH], "5");
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("filename=\"notes.txt\""));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn test_download_percent_encoded_name() {
        let (_tmp, state) = create_test_state();
        std::fs::write(state.root.path().join("my file.txt"), b"spaced").unwrap();

        let response = send(&state, "/download/my%20file.txt").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"spaced");
    }

    #[tokio::test]
    async fn test_download_missing_is_404() {
        let (_tmp, state) = create_test_state();
        let response = send(&state, "/download/nope.bin").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_download_traversal_is_400() {
        let (tmp, state) = create_test_state();
        std::fs::write(tmp.path().join("secret.txt"), b"top secret").unwrap();

        let response = send(&state, "/download/..%2Fsecret.txt").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_download_directory_schedules_cleanup() {
        let (_tmp, state) = create_test_state();
        let dir = state.root.path().join("album");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.txt"), b"a").unwrap();

        let response = send(&state, "/download/album").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("filename=\"album.zip\""));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(b"PK"));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(std::fs::read_dir(&state.temp_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_delete_redirects() {
        let (_tmp, state) = create_test_state();
        let file = state.root.path().join("old.txt");
        std::fs::write(&file, b"x").unwrap();

        let response = send(&state, "/delete/old.txt").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_delete_missing_redirects() {
        let (_tmp, state) = create_test_state();
        let response = send(&state, "/delete/ghost.txt").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_delete_traversal_is_400() {
        let (tmp, state) = create_test_state();
        let victim = tmp.path().join("victim.txt");
        std::fs::write(&victim, b"x").unwrap();

        let response = send(&state, "/delete/..%2Fvictim.txt").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(victim.exists());
    }

    #[tokio::test]
    async fn test_assets_handler_css() {
        let (_tmp, state) = create_test_state();
        let response = send(&state, "/assets/styles.css").await;

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.contains("text/css"));
    }

    #[tokio::test]
    async fn test_assets_handler_not_found() {
        let (_tmp, state) = create_test_state();
        let response = send(&state, "/assets/nonexistent.css").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
