//! Entity store
//!
//! Typed CRUD plus the sync-specific accessors used by the reconciliation
//! pipeline. Every write is transactional at single-record granularity;
//! multi-record operations (`reorder_tasks`, `mark_events_synced`) run one
//! explicit transaction.

use libsql::Connection;
use uuid::Uuid;

use super::Database;
use crate::error::{Error, Result};

/// Handle to the entity tables. Cheap to clone; clones share the
/// underlying connection.
#[derive(Clone)]
pub struct Store {
    pub(super) conn: Connection,
}

impl Store {
    /// Create a store over an open database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            conn: db.connection().clone(),
        }
    }

    /// Timestamp of the last fully successful reconciliation cycle (Unix ms).
    pub async fn last_sync_at(&self) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM settings WHERE key = 'last_sync_at'",
                (),
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        let parsed = raw
            .parse::<i64>()
            .map_err(|_| Error::Database(format!("invalid last_sync_at value {raw:?}")))?;
        Ok(Some(parsed))
    }

    /// Record the completion time of a reconciliation cycle.
    pub async fn set_last_sync_at(&self, timestamp_ms: i64) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES ('last_sync_at', ?)",
                [timestamp_ms.to_string()],
            )
            .await?;
        Ok(())
    }
}

/// Current wall-clock time in Unix milliseconds.
pub(super) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse a nullable `remote_id` column into a [`Uuid`].
pub(super) fn parse_remote_id(raw: Option<String>) -> Result<Option<Uuid>> {
    raw.map(|value| {
        value
            .parse::<Uuid>()
            .map_err(|_| Error::Database(format!("invalid remote id {value:?}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> Store {
        let db = Database::open_in_memory().await.unwrap();
        Store::new(&db)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn last_sync_at_roundtrip() {
        let store = setup().await;
        assert_eq!(store.last_sync_at().await.unwrap(), None);

        store.set_last_sync_at(1_700_000_000_000).await.unwrap();
        assert_eq!(store.last_sync_at().await.unwrap(), Some(1_700_000_000_000));

        store.set_last_sync_at(1_700_000_099_000).await.unwrap();
        assert_eq!(store.last_sync_at().await.unwrap(), Some(1_700_000_099_000));
    }

    #[test]
    fn parse_remote_id_rejects_garbage() {
        assert!(parse_remote_id(Some("not-a-uuid".to_string())).is_err());
        assert_eq!(parse_remote_id(None).unwrap(), None);
    }
}
