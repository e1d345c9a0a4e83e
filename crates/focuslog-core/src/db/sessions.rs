//! Session and session-event store operations

use libsql::{params, Row};
use uuid::Uuid;

use super::projects::set_sync_status;
use super::store::{now_ms, parse_remote_id, Store};
use crate::error::{Error, Result};
use crate::models::{Session, SessionEvent, SyncMeta, SyncStatus};

const SESSION_COLUMNS: &str = "id, start_time, end_time, duration_seconds, focused_seconds, \
     distraction_count, is_complete, created_at, updated_at, remote_id, sync_status, \
     last_synced_at";

const EVENT_COLUMNS: &str = "id, session_id, event_type, timestamp, app_name, duration_seconds, \
     metadata, created_at, remote_id, sync_status, last_synced_at";

impl Store {
    /// Insert or update a session, refreshing `updated_at`. A local edit to
    /// a synced session moves it back to `PendingUpdate`.
    pub async fn save_session(&self, session: &mut Session) -> Result<()> {
        let now = now_ms();
        session.updated_at = now;

        match session.id {
            None => {
                self.conn
                    .execute(
                        "INSERT INTO sessions
                             (start_time, end_time, duration_seconds, focused_seconds,
                              distraction_count, is_complete, created_at, updated_at,
                              remote_id, sync_status, last_synced_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        params![
                            session.start_time,
                            session.end_time,
                            session.duration_seconds,
                            session.focused_seconds,
                            session.distraction_count,
                            i64::from(session.is_complete),
                            session.created_at,
                            now,
                            session.sync.remote_id.map(|id| id.to_string()),
                            session.sync.status.as_i64(),
                            session.sync.last_synced_at,
                        ],
                    )
                    .await?;
                session.id = Some(self.conn.last_insert_rowid());
            }
            Some(id) => {
                if session.sync.status == SyncStatus::Synced {
                    session.sync.status = SyncStatus::PendingUpdate;
                }
                let rows = self
                    .conn
                    .execute(
                        "UPDATE sessions
                             SET start_time = ?, end_time = ?, duration_seconds = ?,
                                 focused_seconds = ?, distraction_count = ?, is_complete = ?,
                                 updated_at = ?, sync_status = ?
                         WHERE id = ?",
                        params![
                            session.start_time,
                            session.end_time,
                            session.duration_seconds,
                            session.focused_seconds,
                            session.distraction_count,
                            i64::from(session.is_complete),
                            now,
                            session.sync.status.as_i64(),
                            id,
                        ],
                    )
                    .await?;
                if rows == 0 {
                    return Err(Error::NotFound(format!("session {id}")));
                }
            }
        }

        Ok(())
    }

    /// Fetch a session by local id.
    pub async fn get_session(&self, id: i64) -> Result<Option<Session>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_session(&row)?)),
            None => Ok(None),
        }
    }

    /// Sessions whose status is anything but `Synced`.
    pub async fn pending_sessions(&self) -> Result<Vec<Session>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE sync_status != 1 ORDER BY id"
                ),
                (),
            )
            .await?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            sessions.push(parse_session(&row)?);
        }
        Ok(sessions)
    }

    /// Set a session's sync status; see [`Store::set_project_sync_status`].
    pub async fn set_session_sync_status(
        &self,
        id: i64,
        status: SyncStatus,
        remote_id: Option<Uuid>,
    ) -> Result<()> {
        let rows = set_sync_status(&self.conn, "sessions", id, status, remote_id).await?;
        if rows == 0 {
            return Err(Error::NotFound(format!("session {id}")));
        }
        Ok(())
    }

    /// Delete a session and, via cascade, its events. Refused while the
    /// session awaits its first upload.
    pub async fn delete_session(&self, id: i64) -> Result<()> {
        let session = self
            .get_session(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {id}")))?;

        if session.sync.status.needs_create() {
            return Err(Error::InvalidInput(format!(
                "session {id} is pending upload and cannot be deleted"
            )));
        }

        self.conn
            .execute("DELETE FROM sessions WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    /// Append an event to a stored session. Events are immutable once
    /// recorded.
    pub async fn record_event(&self, event: &mut SessionEvent) -> Result<()> {
        let metadata = event
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn
            .execute(
                "INSERT INTO session_events
                     (session_id, event_type, timestamp, app_name, duration_seconds,
                      metadata, created_at, remote_id, sync_status, last_synced_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    event.session_id,
                    event.kind.as_str(),
                    event.timestamp,
                    event.app_name.clone(),
                    event.duration_seconds,
                    metadata,
                    event.created_at,
                    event.sync.remote_id.map(|id| id.to_string()),
                    event.sync.status.as_i64(),
                    event.sync.last_synced_at,
                ],
            )
            .await?;
        event.id = Some(self.conn.last_insert_rowid());
        Ok(())
    }

    /// Events for a session that have not yet reached the remote, in
    /// timestamp order.
    pub async fn unsynced_events(&self, session_id: i64) -> Result<Vec<SessionEvent>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM session_events
                     WHERE session_id = ? AND sync_status != 1
                     ORDER BY timestamp, id"
                ),
                [session_id],
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(parse_event(&row)?);
        }
        Ok(events)
    }

    /// Remote-backed sessions that still have events awaiting upload.
    /// Returns `(local session id, session remote id)` pairs.
    pub async fn sessions_with_unsynced_events(&self) -> Result<Vec<(i64, Uuid)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT DISTINCT s.id, s.remote_id
                 FROM sessions s
                 JOIN session_events e ON e.session_id = s.id
                 WHERE e.sync_status != 1 AND s.remote_id IS NOT NULL
                 ORDER BY s.id",
                (),
            )
            .await?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: i64 = row.get(0)?;
            let remote_id = parse_remote_id(row.get(1)?)?
                .ok_or_else(|| Error::Database(format!("session {id} lost its remote id")))?;
            sessions.push((id, remote_id));
        }
        Ok(sessions)
    }

    /// Mark a batch of events synced, assigning remote ids, in one
    /// transaction: either every event in the batch transitions or none do.
    pub async fn mark_events_synced(&self, assignments: &[(i64, Uuid)]) -> Result<()> {
        let now = now_ms();
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        for (id, remote_id) in assignments {
            let result = self
                .conn
                .execute(
                    "UPDATE session_events
                         SET sync_status = 1, remote_id = ?, last_synced_at = ?
                     WHERE id = ?",
                    params![remote_id.to_string(), now, *id],
                )
                .await;

            match result {
                Ok(0) => {
                    self.conn.execute("ROLLBACK", ()).await.ok();
                    return Err(Error::NotFound(format!("session event {id}")));
                }
                Ok(_) => {}
                Err(e) => {
                    self.conn.execute("ROLLBACK", ()).await.ok();
                    return Err(e.into());
                }
            }
        }

        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(())
    }
}

fn parse_session(row: &Row) -> Result<Session> {
    Ok(Session {
        id: Some(row.get(0)?),
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        duration_seconds: row.get(3)?,
        focused_seconds: row.get(4)?,
        distraction_count: row.get(5)?,
        is_complete: row.get::<i64>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        sync: SyncMeta {
            remote_id: parse_remote_id(row.get(9)?)?,
            status: SyncStatus::from_i64(row.get(10)?)?,
            last_synced_at: row.get(11)?,
        },
    })
}

fn parse_event(row: &Row) -> Result<SessionEvent> {
    let metadata = row
        .get::<Option<String>>(6)?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()?;

    Ok(SessionEvent {
        id: Some(row.get(0)?),
        session_id: row.get(1)?,
        kind: row.get::<String>(2)?.parse()?,
        timestamp: row.get(3)?,
        app_name: row.get(4)?,
        duration_seconds: row.get(5)?,
        metadata,
        created_at: row.get(7)?,
        sync: SyncMeta {
            remote_id: parse_remote_id(row.get(8)?)?,
            status: SyncStatus::from_i64(row.get(9)?)?,
            last_synced_at: row.get(10)?,
        },
    })
}
