//! Creating and dropping the CDN tables.

use crate::ddl::{Ddl, Dialect, Table};
use crate::error::{Error, ErrorKind, Result};
use async_trait::async_trait;

/// Where the tables live.
///
/// Implementations run one statement per [`execute`](Self::execute) call and
/// report the identifiers the DDL is rendered with.
#[async_trait]
pub trait Persistence: Send + Sync {
    fn dialect(&self) -> Dialect;
    /// Prepended to every table name.
    fn prefix(&self) -> &str;
    fn charset(&self) -> Option<&str> {
        None
    }
    fn collate(&self) -> Option<&str> {
        None
    }
    async fn execute(&self, statement: &str) -> Result<()>;
}

/// Drops and/or creates both tables.
///
/// Every table is attempted even when an earlier one failed; the returned
/// list holds one error per table that could not be dropped or created, in
/// the order they were attempted. An empty list means success.
#[tracing::instrument(level = "debug", skip(persistence), fields(dialect = ?persistence.dialect(), prefix = persistence.prefix()))]
pub async fn apply(persistence: &dyn Persistence, drop: bool, create: bool) -> Vec<Error> {
    let ddl = match Ddl::new(persistence.dialect(), persistence.prefix(), persistence.charset(), persistence.collate())
    {
        Ok(ddl) => ddl,
        Err(err) => return vec![err],
    };
    let mut errors = Vec::new();
    if drop {
        for table in Table::ALL {
            let name = ddl.table_name(table);
            match persistence.execute(&ddl.drop(table)).await {
                Ok(()) => tracing::info!(table = %name, "Table dropped"),
                Err(err) => errors.push(err.raise(ErrorKind::DropTable(name))),
            }
        }
    }
    if create {
        for table in Table::ALL {
            let name = ddl.table_name(table);
            match create_table(persistence, &ddl, table).await {
                Ok(()) => tracing::debug!(table = %name, "Table ensured"),
                Err(err) => errors.push(err.raise(ErrorKind::CreateTable(name))),
            }
        }
    }
    errors
}

async fn create_table(persistence: &dyn Persistence, ddl: &Ddl, table: Table) -> Result<()> {
    for statement in ddl.create(table) {
        persistence.execute(&statement).await?;
    }
    Ok(())
}

/// MySQL script that resets the queue table, for operators applying the
/// schema by hand.
pub fn queue_reset_sql(prefix: &str, charset: Option<&str>, collate: Option<&str>) -> Result<String> {
    let ddl = Ddl::new(Dialect::MySql, prefix, charset, collate)?;
    let mut sql = ddl.drop(Table::Queue);
    for statement in ddl.create(Table::Queue) {
        sql.push('\n');
        sql.push_str(&statement);
    }
    Ok(sql)
}
