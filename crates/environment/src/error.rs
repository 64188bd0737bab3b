//! Environment Error Types
//!
//! Orchestration keeps going after a failed step, so instead of a single
//! error it collects every failure of one call into an [`ErrorBatch`].

use cdnenv_rules::error::{Error as RulesError, ErrorKind as RulesErrorKind};
use cdnenv_schema::error::Error as SchemaError;
use derive_more::{Display, Error, From};
use std::fmt;

/// Result of one orchestration call.
pub type Result<T> = std::result::Result<T, ErrorBatch>;

/// One failed step.
#[derive(Debug, From)]
pub enum Failure {
    /// Writing or removing the rules block failed.
    Rules(RulesError),
    /// Dropping or creating a table failed.
    Schema(SchemaError),
}
impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rules(err) => write!(f, "{}", &**err),
            Self::Schema(err) => write!(f, "{}", &**err),
        }
    }
}

/// Every failure of one orchestration call, in the order they happened.
#[derive(Debug, Default)]
pub struct ErrorBatch {
    failures: Vec<Failure>,
}

impl ErrorBatch {
    pub fn push(&mut self, failure: impl Into<Failure>) {
        self.failures.push(failure.into());
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Rules changes that need a credential prompt (or a human following
    /// the attached instructions).
    pub fn credential_requests(&self) -> impl Iterator<Item = &RulesErrorKind> {
        self.failures.iter().filter_map(|failure| match failure {
            Failure::Rules(err) if err.needs_credentials() => Some(&**err),
            _ => None,
        })
    }

    /// `Ok` if nothing failed.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Extend<SchemaError> for ErrorBatch {
    fn extend<I: IntoIterator<Item = SchemaError>>(&mut self, iter: I) {
        self.failures.extend(iter.into_iter().map(Failure::Schema));
    }
}

impl fmt::Display for ErrorBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} environment problem(s):", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n- {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorBatch {}

/// An event name that isn't one of `activate`, `deactivate` or `config_save`.
#[derive(Debug, Display, Error)]
#[display("unknown environment event: {_0}")]
pub struct UnknownEvent(#[error(not(source))] pub String);
