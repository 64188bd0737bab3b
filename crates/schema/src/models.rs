use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// What a queued item asks the CDN to do.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum QueueCommand {
    Upload = 1,
    Delete = 2,
    Purge = 3,
}
impl TryFrom<i64> for QueueCommand {
    type Error = Error;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Upload,
            2 => Self::Delete,
            3 => Self::Purge,
            _ => exn::bail!(ErrorKind::InvalidData("queue command")),
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct QueueRow {
    id: i64,
    local_path: String,
    remote_path: String,
    command: i64,
    last_error: String,
    enqueued_at: i64,
}

/// One pending CDN operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueueItem {
    pub id: i64,
    pub local_path: String,
    pub remote_path: String,
    pub command: QueueCommand,
    /// Last failure reason, if the item was attempted before.
    pub last_error: Option<String>,
    pub enqueued_at: UtcDateTime,
}
impl TryFrom<QueueRow> for QueueItem {
    type Error = Error;
    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            local_path: row.local_path,
            remote_path: row.remote_path,
            command: QueueCommand::try_from(row.command)?,
            last_error: (!row.last_error.is_empty()).then_some(row.last_error),
            enqueued_at: UtcDateTime::from_unix_timestamp(row.enqueued_at)
                .or_raise(|| ErrorKind::InvalidData("enqueue date"))?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct PathMapRow {
    path: String,
    path_hash: String,
    #[sqlx(rename = "type")]
    kind: i64,
    remote_id: Option<String>,
}

/// Maps a remote path to the CDN's own identifier for it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathMapEntry {
    /// For reference only; lookups go through `path_hash`.
    pub path: String,
    pub path_hash: String,
    pub kind: u8,
    pub remote_id: Option<String>,
}
impl TryFrom<PathMapRow> for PathMapEntry {
    type Error = Error;
    fn try_from(row: PathMapRow) -> Result<Self, Self::Error> {
        Ok(Self {
            path: row.path,
            path_hash: row.path_hash,
            kind: u8::try_from(row.kind).or_raise(|| ErrorKind::InvalidData("path map type"))?,
            remote_id: row.remote_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, QueueCommand::Upload)]
    #[case(2, QueueCommand::Delete)]
    #[case(3, QueueCommand::Purge)]
    fn test_command_from_column(#[case] value: i64, #[case] expected: QueueCommand) {
        assert_eq!(QueueCommand::try_from(value).unwrap(), expected);
        assert_eq!(expected as i64, value);
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(-1)]
    fn test_unknown_command(#[case] value: i64) {
        assert!(QueueCommand::try_from(value).is_err());
    }

    #[test]
    fn test_row_to_model() {
        let enqueued = UtcDateTime::now();
        let row = QueueRow {
            id: 7,
            local_path: "wp-content/uploads/a.png".to_string(),
            remote_path: "uploads/a.png".to_string(),
            command: 1,
            last_error: String::new(),
            enqueued_at: enqueued.unix_timestamp(),
        };
        let item = QueueItem::try_from(row).unwrap();
        assert_eq!(item.command, QueueCommand::Upload);
        assert_eq!(item.last_error, None);
        // Unix timestamps drop the nanoseconds.
        assert_eq!(item.enqueued_at, enqueued.replace_nanosecond(0).unwrap());
    }

    #[test]
    fn test_path_map_type_out_of_range() {
        let row = PathMapRow { path: "a".to_string(), path_hash: "h".to_string(), kind: 300, remote_id: None };
        assert!(PathMapEntry::try_from(row).is_err());
    }
}
