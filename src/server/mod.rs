//! Web server exposing the shared directory.

pub mod assets;
pub mod error;
pub mod routes;
pub mod templates;

pub use assets::{content_type, StaticAssets};
pub use error::AppError;
pub use routes::{build_router, AppState};
pub use templates::{encode_name, EntryView, IndexView, TemplateEngine, Templates};

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::config::{DEFAULT_BIND, DEFAULT_PORT};
use crate::files::{SharedRoot, DEFAULT_CLEANUP_DELAY};
use crate::net::{list_addresses, server_urls};

/// Configuration for the web server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (defaults to all interfaces).
    pub bind: IpAddr,
    /// Port to listen on (defaults to 3001).
    pub port: u16,
    /// Whether to open the browser once listening.
    pub open_browser: bool,
    /// How long a directory archive outlives its download.
    pub cleanup_delay: Duration,
    /// Where directory archives are written.
    pub temp_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            port: DEFAULT_PORT,
            open_browser: false,
            cleanup_delay: DEFAULT_CLEANUP_DELAY,
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Run the web server for `root` until Ctrl+C or SIGTERM.
///
/// Prints the shared directory and every URL other devices can use, then
/// serves requests. Optionally opens the local page in a browser.
pub async fn run_server(root: SharedRoot, config: ServerConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.bind, config.port);
    let listener = TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();

    println!("File manager running on port {}", port);
    println!("Shared directory: {}", root.path().display());
    println!("Available at:");
    for url in server_urls(&list_addresses(), port) {
        println!("  {}", url);
    }
    println!("Press Ctrl+C to stop");
    info!(%addr, root = %root.path().display(), "Server listening");

    let state = Arc::new(AppState {
        temp_dir: config.temp_dir,
        cleanup_delay: config.cleanup_delay,
        ..AppState::new(root, port)
    });

    if config.open_browser {
        let url = format!("http://localhost:{}", port);
        if let Err(e) = webbrowser::open(&url) {
            warn!(error = %e, "Failed to open browser");
        }
    }

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\nServer stopped");
    Ok(())
}

/// Wait for the shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.bind, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(config.cleanup_delay, Duration::from_secs(60));
        assert!(!config.open_browser);
    }
}
