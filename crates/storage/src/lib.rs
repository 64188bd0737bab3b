//! Storage backends for web server configuration files.
//!
//! Rule files (`.htaccess`, `nginx.conf` includes) live somewhere under a
//! document or configuration root. Callers address them by paths relative to
//! that root and never touch the filesystem directly, which keeps the rule
//! reconciliation logic testable against [`MockBackend`](backend::MockBackend).

pub mod backend;
pub mod error;

pub use crate::backend::StorageBackend;
pub use crate::backend::validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
