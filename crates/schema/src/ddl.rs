//! DDL for the two CDN tables, rendered per SQL dialect.

use crate::error::{ErrorKind, Result};
use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:literal) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

regex!(PREFIX, r"^[A-Za-z0-9_]*$");
regex!(CHARSET, r"^[A-Za-z0-9_]+$");

pub const QUEUE_SUFFIX: &str = "cdn_queue";
pub const PATHMAP_SUFFIX: &str = "cdn_pathmap";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dialect {
    Sqlite,
    MySql,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Table {
    /// Pending upload/delete/purge commands.
    Queue,
    /// Remote path to remote object id.
    PathMap,
}
impl Table {
    pub const ALL: [Self; 2] = [Self::Queue, Self::PathMap];

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Queue => QUEUE_SUFFIX,
            Self::PathMap => PATHMAP_SUFFIX,
        }
    }
}

/// Validated identifiers plus a dialect: everything needed to render DDL.
#[derive(Clone, Debug)]
pub struct Ddl {
    dialect: Dialect,
    prefix: String,
    options: String,
}

impl Ddl {
    /// Empty charset/collation values count as unset.
    pub fn new(dialect: Dialect, prefix: &str, charset: Option<&str>, collate: Option<&str>) -> Result<Self> {
        if !PREFIX.is_match(prefix) {
            exn::bail!(ErrorKind::InvalidIdentifier(prefix.to_string()));
        }
        let charset = charset.filter(|c| !c.is_empty());
        let collate = collate.filter(|c| !c.is_empty());
        for value in charset.iter().chain(collate.iter()) {
            if !CHARSET.is_match(value) {
                exn::bail!(ErrorKind::InvalidIdentifier(value.to_string()));
            }
        }
        let mut options = String::new();
        if let Some(charset) = charset {
            options.push_str(&format!(" DEFAULT CHARACTER SET {charset}"));
        }
        if let Some(collate) = collate {
            options.push_str(&format!(" COLLATE {collate}"));
        }
        Ok(Self { dialect, prefix: prefix.to_string(), options })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn table_name(&self, table: Table) -> String {
        format!("{}{}", self.prefix, table.suffix())
    }

    fn quote(&self, name: &str) -> String {
        match self.dialect {
            Dialect::Sqlite => format!("\"{name}\""),
            Dialect::MySql => format!("`{name}`"),
        }
    }

    pub fn drop(&self, table: Table) -> String {
        format!("DROP TABLE IF EXISTS {};", self.quote(&self.table_name(table)))
    }

    /// Statements creating `table` and its secondary index, each safe to
    /// re-run.
    pub fn create(&self, table: Table) -> Vec<String> {
        let name = self.table_name(table);
        let quoted = self.quote(&name);
        match (self.dialect, table) {
            (Dialect::Sqlite, Table::Queue) => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {quoted} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    local_path TEXT NOT NULL DEFAULT '',
    remote_path TEXT NOT NULL DEFAULT '',
    command INTEGER NOT NULL DEFAULT 0,
    last_error TEXT NOT NULL DEFAULT '',
    enqueued_at INTEGER NOT NULL DEFAULT 0
);"
                ),
                format!("CREATE INDEX IF NOT EXISTS \"{name}_enqueued_at\" ON {quoted} (enqueued_at);"),
            ],
            (Dialect::Sqlite, Table::PathMap) => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS {quoted} (
    path TEXT NOT NULL,
    path_hash TEXT NOT NULL PRIMARY KEY,
    type INTEGER NOT NULL DEFAULT 0,
    remote_id TEXT
);"
                ),
                format!("CREATE INDEX IF NOT EXISTS \"{name}_remote_id\" ON {quoted} (remote_id);"),
            ],
            (Dialect::MySql, Table::Queue) => vec![format!(
                "CREATE TABLE IF NOT EXISTS {quoted} (
    `id` int(11) unsigned NOT NULL AUTO_INCREMENT,
    `local_path` varchar(500) NOT NULL DEFAULT '',
    `remote_path` varchar(500) NOT NULL DEFAULT '',
    `command` tinyint(1) unsigned NOT NULL DEFAULT '0' COMMENT '1 - Upload, 2 - Delete, 3 - Purge',
    `last_error` varchar(150) NOT NULL DEFAULT '',
    `enqueued_at` datetime NOT NULL DEFAULT '1970-01-01 00:00:00',
    PRIMARY KEY (`id`),
    KEY `enqueued_at` (`enqueued_at`)
){};",
                self.options
            )],
            (Dialect::MySql, Table::PathMap) => vec![format!(
                "CREATE TABLE IF NOT EXISTS {quoted} (
    `path` TEXT NOT NULL,
    `path_hash` VARCHAR(64) CHARACTER SET ascii NOT NULL,
    `type` tinyint(1) NOT NULL DEFAULT '0',
    `remote_id` VARCHAR(200) CHARACTER SET ascii,
    PRIMARY KEY (`path_hash`),
    KEY `remote_id` (`remote_id`)
){};",
                self.options
            )],
        }
    }
}
