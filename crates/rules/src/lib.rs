//! Web server rule blocks for CDN-served assets.
//!
//! Several subsystems share one server configuration file (`.htaccess` or an
//! Nginx include), each owning a block between a `# BEGIN ...` and a
//! `# END ...` line. This crate generates the CDN block and edits such files
//! without disturbing anything outside the block:
//!
//! - [`generate`] renders the CORS / canonical-header directives.
//! - [`RulesDocument`] is the pure line-sequence model of a shared file.
//! - [`RulesFile`] applies documents to files through a storage backend and
//!   turns permission problems into [`CredentialsRequired`](error::ErrorKind::CredentialsRequired).

mod document;
pub mod error;
mod file;
mod generate;
pub mod markers;

pub use crate::document::RulesDocument;
pub use crate::file::{RuleWriter, RulesFile};
pub use crate::generate::{CANONICAL_EXTENSIONS, FONT_EXTENSIONS, RuleOptions, ServerKind, generate};
pub use crate::markers::Hint;
