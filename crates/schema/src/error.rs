//! Schema Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A schema error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    /// A table prefix, charset or collation that can't be spliced into DDL.
    #[display("invalid SQL identifier: `{_0}`")]
    InvalidIdentifier(#[error(not(source))] String),
    #[display("can't create table {_0}")]
    CreateTable(#[error(not(source))] String),
    #[display("can't drop table {_0}")]
    DropTable(#[error(not(source))] String),
    /// A stored row holds a value the model can't represent.
    #[display("invalid {_0} in stored row")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::CreateTable(_) | Self::DropTable(_))
    }
}
