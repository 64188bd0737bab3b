//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{StorageBackend, validate_path};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files live in a `HashMap` behind a [`RwLock`], so all trait methods can
/// operate on `&self`. Individual paths can be [protected](Self::protect) or
/// made [unreadable](Self::unreadable) to simulate rule files the web server
/// user is not allowed to touch.
///
/// # Examples
///
/// ```
/// use cdnenv_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([(".htaccess", "# BEGIN WordPress\n")]);
/// assert!(backend.exists(Path::new(".htaccess")).await?);
/// assert_eq!(backend.writes(), 0);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    protected: HashSet<PathBuf>,
    unreadable: HashSet<PathBuf>,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, then the
    /// test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            map.insert(Self::validated(&path.into(), "with_files"), data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            protected: HashSet::new(),
            unreadable: HashSet::new(),
            writes: AtomicUsize::new(0),
        }
    }

    /// Refuse writes of `path` with
    /// [`PermissionDenied`](ErrorKind::PermissionDenied). Reads still work.
    pub fn protect(mut self, path: impl AsRef<Path>) -> Self {
        self.protected.insert(Self::validated(path.as_ref(), "protect"));
        self
    }

    /// Refuse reads and writes of `path` with
    /// [`PermissionDenied`](ErrorKind::PermissionDenied). The file still
    /// shows up as existing.
    pub fn unreadable(mut self, path: impl AsRef<Path>) -> Self {
        let path = Self::validated(path.as_ref(), "unreadable");
        self.protected.insert(path.clone());
        self.unreadable.insert(path);
        self
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Synchronous snapshot of a file as UTF-8 text, for assertions.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let path = validate_path(path.as_ref()).ok()?;
        let guard = self.storage.try_read().ok()?;
        guard.get(&path).map(|data| String::from_utf8_lossy(data).into_owned())
    }

    fn validated(path: &Path, caller: &str) -> PathBuf {
        let Ok(validated) = validate_path(path) else {
            panic!("MockBackend::{caller}: invalid path {}", path.display());
        };
        validated
    }

    fn guard_writable(&self, path: &Path) -> Result<()> {
        if self.protected.contains(path) {
            exn::bail!(ErrorKind::PermissionDenied(path.to_path_buf()));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        if self.unreadable.contains(&path) {
            exn::bail!(ErrorKind::PermissionDenied(path));
        }
        self.storage.read().await.get(&path).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(path)))
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.guard_writable(&path)?;
        self.storage.write().await.insert(path, data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let backend = MockBackend::default();
        backend.write(Path::new(".htaccess"), b"hello").await.unwrap();
        assert_eq!(backend.read(Path::new(".htaccess")).await.unwrap(), b"hello");
        assert_eq!(backend.contents(".htaccess").as_deref(), Some("hello"));
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let backend = MockBackend::default();
        let err = backend.read(Path::new("missing")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_protected_path_refuses_changes() {
        let backend = MockBackend::with_files([(".htaccess", "keep")]).protect(".htaccess");
        let err = backend.write(Path::new(".htaccess"), b"changed").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert!(err.needs_credentials());
        assert_eq!(backend.read(Path::new(".htaccess")).await.unwrap(), b"keep");
        assert_eq!(backend.writes(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_path_refuses_reads() {
        let backend = MockBackend::with_files([("nginx.conf", "x")]).unreadable("nginx.conf");
        assert!(backend.exists(Path::new("nginx.conf")).await.unwrap());
        let err = backend.read(Path::new("nginx.conf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::PermissionDenied(_)));
        assert!(backend.write(Path::new("nginx.conf"), b"y").await.is_err());
        assert_eq!(backend.contents("nginx.conf").as_deref(), Some("x"));
    }

    #[test]
    #[should_panic(expected = "invalid path")]
    fn test_with_files_panics_on_bad_path() {
        MockBackend::with_files([("../escape", "bad")]);
    }
}
