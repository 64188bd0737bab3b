//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, a small async CRUD
//! interface over the directory that holds web server rule files.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the storage root and are validated with
/// [`validate_path`] before use. Implementations must enforce this.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cdnenv_storage::{backend::StorageBackend, error::Result};
///
/// async fn current_rules(backend: &dyn StorageBackend) -> Result<String> {
///     let path = Path::new(".htaccess");
///     if !backend.exists(path).await? {
///         return Ok(String::new());
///     }
///     let data = backend.read(path).await?;
///     Ok(String::from_utf8_lossy(&data).into_owned())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write file contents, creating or replacing the file.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    /// - A write the process is not allowed to make must surface as
    ///   [`PermissionDenied`](crate::error::ErrorKind::PermissionDenied) so
    ///   callers can ask for credentials.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}

/// Validates a storage path so it can never escape the storage root.
///
/// `..` components are resolved against the components seen so far and
/// rejected once they would climb above the root. Null bytes, Windows
/// prefixes and paths that normalize to nothing are rejected too.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use cdnenv_storage::validate_path;
///
/// assert_eq!(validate_path("/site/./.htaccess").unwrap(), Path::new("site/.htaccess"));
/// assert!(validate_path("conf/../../etc/nginx.conf").is_err());
/// assert!(validate_path("").is_err());
/// ```
pub fn validate_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || exn::Exn::from(ErrorKind::InvalidPath(original.to_path_buf()));
    let mut kept = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(segment) if segment.as_encoded_bytes().contains(&0) => return Err(invalid()),
            Component::Normal(segment) => kept.push(segment),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => return Err(invalid()),
            Component::ParentDir => {
                kept.pop().ok_or_else(invalid)?;
            },
        }
    }
    if kept.is_empty() {
        return Err(invalid());
    }
    Ok(kept.into_iter().collect())
}
