//! Log file output.
//!
//! Kept in its own test binary because `init_logging` installs the global
//! subscriber, which can only happen once per process.

use std::fs;

use tempfile::TempDir;
use tracing::{debug, info};

use lanshare::logging::{init_logging, LogConfig, Verbosity};

#[test]
fn test_log_file_receives_debug_at_normal_verbosity() {
    let tmp = TempDir::new().unwrap();
    let log_path = tmp.path().join("lanshare.log");

    let guard = init_logging(&LogConfig {
        verbosity: Verbosity::Normal,
        log_file: Some(log_path.clone()),
    });

    debug!(path = "share/a.txt", "archive cleanup scheduled");
    info!(name = "a.txt", bytes = 3, "upload stored");

    // Dropping the guard flushes the background writer.
    drop(guard);

    let contents = fs::read_to_string(&log_path).unwrap();
    assert!(contents.contains("archive cleanup scheduled"), "{contents}");
    assert!(contents.contains("DEBUG"), "{contents}");
    assert!(contents.contains("upload stored"), "{contents}");
}
