//! Repositories over the queue and path map tables.
//!
//! Table names depend on the configured prefix, so queries are assembled at
//! runtime from validated names instead of being compiled in.

use crate::Database;
use crate::ddl::{Ddl, Dialect, Table};
use crate::error::{ErrorKind, Result};
use crate::lifecycle::Persistence;
use crate::models::{PathMapEntry, PathMapRow, QueueCommand, QueueItem, QueueRow};
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;

/// Longest failure message kept per queue item, in characters.
pub const MAX_ERROR_LEN: usize = 150;

/// Lookup key for a remote path.
pub fn path_hash(remote_path: &str) -> String {
    blake3::hash(remote_path.as_bytes()).to_hex().to_string()
}

fn table_name(db: &Database, table: Table) -> Result<String> {
    Ok(Ddl::new(Dialect::Sqlite, db.prefix(), None, None)?.table_name(table))
}

/// FIFO of pending upload/delete/purge commands.
#[derive(Debug, Clone)]
pub struct QueueRepository {
    pool: SqlitePool,
    table: String,
}

impl QueueRepository {
    pub fn new(db: &Database) -> Result<Self> {
        Ok(Self { pool: db.pool().clone(), table: table_name(db, Table::Queue)? })
    }

    /// Returns the new item's id.
    pub async fn enqueue(&self, local_path: &str, remote_path: &str, command: QueueCommand) -> Result<i64> {
        self.enqueue_at(local_path, remote_path, command, UtcDateTime::now()).await
    }

    pub async fn enqueue_at(
        &self,
        local_path: &str,
        remote_path: &str,
        command: QueueCommand,
        at: UtcDateTime,
    ) -> Result<i64> {
        let sql = format!(
            "INSERT INTO \"{}\" (local_path, remote_path, command, last_error, enqueued_at) VALUES (?, ?, ?, '', ?)",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(local_path)
            .bind(remote_path)
            .bind(command as i64)
            .bind(at.unix_timestamp())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.last_insert_rowid())
    }

    /// Oldest items first; ties keep insertion order.
    pub async fn pending(&self, limit: u32) -> Result<Vec<QueueItem>> {
        let sql = format!("SELECT * FROM \"{}\" ORDER BY enqueued_at, id LIMIT ?", self.table);
        sqlx::query_as::<_, QueueRow>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?
            .into_iter()
            .map(QueueItem::try_from)
            .collect()
    }

    /// Stores why the last attempt failed, cut to [`MAX_ERROR_LEN`].
    pub async fn record_error(&self, id: i64, message: &str) -> Result<()> {
        let message: String = message.chars().take(MAX_ERROR_LEN).collect();
        let sql = format!("UPDATE \"{}\" SET last_error = ? WHERE id = ?", self.table);
        sqlx::query(&sql)
            .bind(message)
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Returns `true` if the item existed.
    pub async fn remove(&self, id: i64) -> Result<bool> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = ?", self.table);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

/// Remote path to remote object id, keyed by [`path_hash`].
#[derive(Debug, Clone)]
pub struct PathMapRepository {
    pool: SqlitePool,
    table: String,
}

impl PathMapRepository {
    pub fn new(db: &Database) -> Result<Self> {
        Ok(Self { pool: db.pool().clone(), table: table_name(db, Table::PathMap)? })
    }

    pub async fn upsert(&self, remote_path: &str, kind: u8, remote_id: Option<&str>) -> Result<()> {
        let sql = format!(
            "INSERT INTO \"{}\" (path, path_hash, type, remote_id) VALUES (?, ?, ?, ?)
            ON CONFLICT (path_hash) DO UPDATE SET path = excluded.path, type = excluded.type, remote_id = excluded.remote_id",
            self.table
        );
        sqlx::query(&sql)
            .bind(remote_path)
            .bind(path_hash(remote_path))
            .bind(i64::from(kind))
            .bind(remote_id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    pub async fn get(&self, remote_path: &str) -> Result<Option<PathMapEntry>> {
        let sql = format!("SELECT * FROM \"{}\" WHERE path_hash = ?", self.table);
        sqlx::query_as::<_, PathMapRow>(&sql)
            .bind(path_hash(remote_path))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?
            .map(PathMapEntry::try_from)
            .transpose()
    }

    /// Returns `true` if an entry existed.
    pub async fn remove(&self, remote_path: &str) -> Result<bool> {
        let sql = format!("DELETE FROM \"{}\" WHERE path_hash = ?", self.table);
        let result = sqlx::query(&sql)
            .bind(path_hash(remote_path))
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
