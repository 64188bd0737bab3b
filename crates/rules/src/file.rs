//! Reading, editing and writing rules files through a storage backend.

use crate::document::RulesDocument;
use crate::error::{Error, ErrorKind, Result};
use crate::markers::Hint;
use async_trait::async_trait;
use cdnenv_storage::BackendHandle;
use cdnenv_storage::error::Error as StorageError;
use exn::ResultExt;
use std::path::Path;

/// Writes and removes marker-delimited blocks in rules files.
///
/// Implementations must report a write the process isn't allowed to make as
/// [`ErrorKind::CredentialsRequired`] so a credential prompt can retry it.
#[async_trait]
pub trait RuleWriter: Send + Sync {
    /// Makes `path` hold exactly `content` between `begin` and `end`.
    /// Empty content removes the block.
    async fn write(&self, path: &Path, begin: &str, end: &str, content: &str, hints: &[Hint<'_>]) -> Result<()>;

    /// Removes the block from `path`. Missing files and missing blocks are
    /// not errors.
    async fn delete(&self, path: &Path, begin: &str, end: &str) -> Result<()>;
}

/// [`RuleWriter`] over a [`StorageBackend`](cdnenv_storage::StorageBackend).
///
/// Every call is one read-modify-write of the whole file. Nothing is written
/// when the file already has the requested content. Callers must not run two
/// writers against the same file concurrently.
#[derive(Clone)]
pub struct RulesFile {
    backend: BackendHandle,
}

impl RulesFile {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    async fn load(&self, path: &Path, on_denied: impl Fn() -> ErrorKind) -> Result<Option<RulesDocument>> {
        match self.backend.exists(path).await {
            Ok(true) => {},
            Ok(false) => return Ok(None),
            Err(e) => return Err(Self::classify(e, path, &on_denied)),
        }
        let data = self.backend.read(path).await.map_err(|e| Self::classify(e, path, &on_denied))?;
        let text = String::from_utf8(data).or_raise(|| ErrorKind::Encoding(path.to_path_buf()))?;
        Ok(Some(RulesDocument::parse(&text)))
    }

    async fn save(&self, path: &Path, document: &RulesDocument, on_denied: impl Fn() -> ErrorKind) -> Result<()> {
        self.backend
            .write(path, document.to_string().as_bytes())
            .await
            .map_err(|e| Self::classify(e, path, &on_denied))
    }

    fn classify(err: StorageError, path: &Path, on_denied: &impl Fn() -> ErrorKind) -> Error {
        if err.needs_credentials() {
            err.raise(on_denied())
        } else {
            err.raise(ErrorKind::Io(path.to_path_buf()))
        }
    }
}

#[async_trait]
impl RuleWriter for RulesFile {
    async fn write(&self, path: &Path, begin: &str, end: &str, content: &str, hints: &[Hint<'_>]) -> Result<()> {
        let denied = |existing: Option<bool>| credentials_required(path, begin, end, content, existing);
        let mut document = match self.load(path, || denied(None)).await? {
            Some(document) => document,
            None if content.trim().is_empty() => return Ok(()),
            None => RulesDocument::default(),
        };
        let replacing = document.contains(begin, end)?;
        if !document.upsert(content, begin, end, hints)? {
            tracing::debug!(path = %path.display(), marker = begin, "Rules already up to date");
            return Ok(());
        }
        self.save(path, &document, || denied(Some(replacing))).await?;
        tracing::info!(backend = self.backend.name(), path = %path.display(), marker = begin, "Rules block written");
        Ok(())
    }

    async fn delete(&self, path: &Path, begin: &str, end: &str) -> Result<()> {
        let denied = || credentials_required(path, begin, end, "", Some(true));
        let Some(mut document) = self.load(path, denied).await? else {
            return Ok(());
        };
        if !document.remove(begin, end)? {
            return Ok(());
        }
        self.save(path, &document, denied).await?;
        tracing::info!(backend = self.backend.name(), path = %path.display(), marker = begin, "Rules block removed");
        Ok(())
    }
}

/// What someone with write access has to do by hand. `existing` tells
/// whether the file already holds the block; `None` when it couldn't be read.
fn credentials_required(path: &Path, begin: &str, end: &str, content: &str, existing: Option<bool>) -> ErrorKind {
    let file = path.display();
    let instructions = match (content.trim().is_empty(), existing) {
        (true, _) => format!("Edit file {file} and remove all lines between and including {begin} and {end} markers."),
        (false, Some(true)) => {
            format!("Edit file {file} and replace all lines between and including {begin} and {end} markers with:")
        },
        (false, Some(false)) => {
            format!("Edit file {file} and add the following rules above the application directives:")
        },
        (false, None) => format!(
            "Edit file {file} and make sure the lines between and including {begin} and {end} markers are exactly:"
        ),
    };
    let content = (!content.trim().is_empty()).then(|| content.to_string());
    ErrorKind::CredentialsRequired { path: path.to_path_buf(), content, instructions }
}
