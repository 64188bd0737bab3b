//! Database connection and pool management.

use crate::ddl::Dialect;
use crate::error::{ErrorKind, Result};
use crate::lifecycle::Persistence;
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use tracing::instrument;

// Reconciliation runs one statement at a time; the pool mostly serves the
// queue repositories.
const MAX_CONNECTIONS: u32 = 4;

/// SQLite-backed [`Persistence`].
///
/// Unlike a migrated database, the CDN tables are created and dropped at
/// runtime by [`apply`](crate::apply) because their names depend on the
/// configured prefix.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    prefix: String,
    charset: Option<String>,
    collate: Option<String>,
}

impl Database {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Applies the query-based PRAGMAs to every pooled connection, not
            // only the first one.
            .after_connect(|conn, meta| Box::pin(async move {
                Self::apply_pragmas(conn, meta).await
            }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Self { pool, prefix: String::new(), charset: None, collate: None })
    }

    /// Connect to the database at the given path, creating the file if it
    /// doesn't exist.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::base_options().filename(path.as_ref()).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database (useful for testing).
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Do NOT apply `#[cfg(test)]` so that other crates can also use this in their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Parallel connections to `:memory:` would each see their own
        // database, so stick to one.
        Self::new(options, Some(1)).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // Host events can overlap with a queue run holding the write lock.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA locking_mode = NORMAL;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Recorded for [`Persistence::charset`]; SQLite itself ignores it.
    pub fn with_charset(mut self, charset: Option<String>) -> Self {
        self.charset = charset;
        self
    }

    pub fn with_collate(mut self, collate: Option<String>) -> Self {
        self.collate = collate;
        self
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// Waits for all connections to be returned to the pool and then closes
    /// them. The instance must not be used afterwards.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[async_trait]
impl Persistence for Database {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    fn collate(&self) -> Option<&str> {
        self.collate.as_deref()
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        sqlx::query(statement).execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}
