//! Operations on the shared directory.
//!
//! Everything the HTTP layer does to the file system goes through here:
//! listing the root, preparing downloads (zipping directories), deleting
//! files and storing uploads. Client-supplied names are resolved through
//! [`SharedRoot::resolve`], which never yields a path outside the root.

pub mod archive;
pub mod error;
pub mod listing;
pub mod mutation;
pub mod root;
pub mod transfer;
pub mod upload;

pub use archive::{build_archive, CleanupGuard, CleanupHandle, TemporaryArchive, DEFAULT_CLEANUP_DELAY};
pub use error::{FileError, FileResult};
pub use listing::{format_size, list_entries, Entry};
pub use mutation::{delete_entry, DeleteOutcome};
pub use root::{normalize_relative, SharedRoot};
pub use transfer::{prepare_download, Download};
pub use upload::{sanitize_upload_name, save_upload, UploadedFile};
