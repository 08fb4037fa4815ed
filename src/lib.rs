//! lanshare: share a directory with every device on the local network.
//!
//! The server lists the shared directory, accepts uploads, streams downloads
//! (zipping directories on the fly) and deletes single files.

pub mod config;
pub mod files;
pub mod logging;
pub mod net;
pub mod server;
