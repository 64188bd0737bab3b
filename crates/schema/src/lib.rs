//! Persisted state for CDN synchronisation.
//!
//! Two tables back the CDN workers:
//! - **Queue** (`{prefix}cdn_queue`): upload/delete/purge commands waiting
//!   to be sent, drained oldest first.
//! - **Path map** (`{prefix}cdn_pathmap`): remote paths to the identifiers
//!   some CDNs assign to uploaded objects, keyed by a BLAKE3 hash of the path.
//!
//! [`apply`] creates and drops both tables through any [`Persistence`];
//! [`Database`] is the bundled SQLite one.

mod db;
mod ddl;
pub mod error;
mod lifecycle;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::ddl::{Ddl, Dialect, PATHMAP_SUFFIX, QUEUE_SUFFIX, Table};
pub use crate::lifecycle::{Persistence, apply, queue_reset_sql};
pub use crate::models::{PathMapEntry, QueueCommand, QueueItem};
pub use crate::repo::{MAX_ERROR_LEN, PathMapRepository, QueueRepository, path_hash};
