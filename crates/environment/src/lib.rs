//! CDN environment reconciliation.
//!
//! Turning a CDN on or off touches three things outside the configuration
//! itself: a block of header directives in the shared web server rules file,
//! two recurring jobs (queue draining and auto-upload), and two tables (the
//! work queue and the path map). [`EnvironmentFixer`] brings all three in
//! line with a [`Config`](cdnenv_config::Config) whenever the host asks:
//!
//! - on admin requests ([`EnvironmentFixer::fix_on_request`]),
//! - after activation or a configuration save ([`EnvironmentFixer::fix_on_event`]),
//! - after deactivation ([`EnvironmentFixer::fix_after_deactivation`]).
//!
//! Every call is idempotent and runs every step even when an earlier one
//! fails; failures come back together as an [`ErrorBatch`].

mod engine;
pub mod error;
mod fixer;
pub mod reconcile;
mod server;

pub use crate::engine::{EngineCatalog, FTP_ENGINE, KnownEngines, MIRROR_ENGINES};
pub use crate::error::{ErrorBatch, Failure};
pub use crate::fixer::{EnvironmentFixer, Event, Instruction, RequiredRule, open_database};
pub use crate::server::{ServerDetector, ServerSoftware};
