//! Rules Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A rules error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rules operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A begin marker was found without a matching end marker after it. The
    /// file has to be fixed by hand; guessing where the block ends could eat
    /// another subsystem's rules.
    #[display("rules block `{_0}` has no matching end marker")]
    MalformedBlock(#[error(not(source))] String),
    /// The block handed to the writer is not wrapped in its own markers, so
    /// it could never be found again on the next run.
    #[display("rules block is not wrapped in `{begin}` ... `{end}`")]
    MarkerMismatch { begin: String, end: String },
    /// The rules file could not be written with the current filesystem
    /// access. Carries everything a credential prompt (or a human following
    /// `instructions`) needs to retry the change.
    #[display("credentials required to modify {}", path.display())]
    CredentialsRequired {
        path: PathBuf,
        /// Block content that should end up in the file; `None` for removals.
        content: Option<String>,
        instructions: String,
    },
    /// The rules file holds bytes that are not UTF-8.
    #[display("rules file is not valid UTF-8: {}", _0.display())]
    Encoding(#[error(not(source))] PathBuf),
    /// Reading or writing the rules file failed for another reason.
    #[display("could not access rules file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// Returns `true` if supplying filesystem credentials would let a retry
    /// succeed.
    pub fn needs_credentials(&self) -> bool {
        matches!(self, Self::CredentialsRequired { .. })
    }
}
