//! Rules block reconciliation that records failures instead of stopping.

use crate::error::ErrorBatch;
use cdnenv_rules::{Hint, RuleWriter};
use std::path::Path;

/// Makes `path` hold exactly `block` between `begin` and `end`, placing a new
/// block by `hints`. An empty `block` removes it. Failures land in `batch`.
pub async fn add_or_update(
    batch: &mut ErrorBatch,
    writer: &dyn RuleWriter,
    path: &Path,
    block: &str,
    begin: &str,
    end: &str,
    hints: &[Hint<'_>],
) {
    if let Err(err) = writer.write(path, begin, end, block, hints).await {
        tracing::warn!(path = %path.display(), marker = begin, error = ?err, "Could not update rules block");
        batch.push(err);
    }
}

/// Removes the `begin`..`end` block from `path`, if any. Failures land in
/// `batch`.
pub async fn remove(batch: &mut ErrorBatch, writer: &dyn RuleWriter, path: &Path, begin: &str, end: &str) {
    if let Err(err) = writer.delete(path, begin, end).await {
        tracing::warn!(path = %path.display(), marker = begin, error = ?err, "Could not remove rules block");
        batch.push(err);
    }
}
