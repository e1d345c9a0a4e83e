//! Project store operations

use libsql::{params, Row};
use uuid::Uuid;

use super::store::{now_ms, parse_remote_id, Store};
use crate::error::{Error, Result};
use crate::models::{Project, SyncMeta, SyncStatus};

const PROJECT_COLUMNS: &str =
    "id, name, created_at, updated_at, remote_id, sync_status, last_synced_at";

impl Store {
    /// Insert or update a project, refreshing `updated_at`.
    ///
    /// A local edit to an already-synced record moves it back to
    /// `PendingUpdate`; sync metadata is otherwise only touched by the
    /// sync-specific accessors.
    pub async fn save_project(&self, project: &mut Project) -> Result<()> {
        let now = now_ms();
        project.updated_at = now;

        match project.id {
            None => {
                self.conn
                    .execute(
                        "INSERT INTO projects
                             (name, created_at, updated_at, remote_id, sync_status, last_synced_at)
                         VALUES (?, ?, ?, ?, ?, ?)",
                        params![
                            project.name.clone(),
                            project.created_at,
                            now,
                            project.sync.remote_id.map(|id| id.to_string()),
                            project.sync.status.as_i64(),
                            project.sync.last_synced_at,
                        ],
                    )
                    .await?;
                project.id = Some(self.conn.last_insert_rowid());
            }
            Some(id) => {
                if project.sync.status == SyncStatus::Synced {
                    project.sync.status = SyncStatus::PendingUpdate;
                }
                let rows = self
                    .conn
                    .execute(
                        "UPDATE projects SET name = ?, updated_at = ?, sync_status = ? WHERE id = ?",
                        params![
                            project.name.clone(),
                            now,
                            project.sync.status.as_i64(),
                            id,
                        ],
                    )
                    .await?;
                if rows == 0 {
                    return Err(Error::NotFound(format!("project {id}")));
                }
            }
        }

        Ok(())
    }

    /// Fetch a project by local id.
    pub async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_project(&row)?)),
            None => Ok(None),
        }
    }

    /// List all projects, oldest first.
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at, id"),
                (),
            )
            .await?;

        let mut projects = Vec::new();
        while let Some(row) = rows.next().await? {
            projects.push(parse_project(&row)?);
        }
        Ok(projects)
    }

    /// Projects whose status is anything but `Synced`.
    pub async fn pending_projects(&self) -> Result<Vec<Project>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects WHERE sync_status != 1 ORDER BY id"
                ),
                (),
            )
            .await?;

        let mut projects = Vec::new();
        while let Some(row) = rows.next().await? {
            projects.push(parse_project(&row)?);
        }
        Ok(projects)
    }

    /// Hard-delete a project. Refused while the record awaits its first
    /// upload; any remote-side deletion is out of scope.
    pub async fn delete_project(&self, id: i64) -> Result<()> {
        let project = self
            .get_project(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("project {id}")))?;

        if project.sync.status.needs_create() {
            return Err(Error::InvalidInput(format!(
                "project {id} is pending upload and cannot be deleted"
            )));
        }

        self.conn
            .execute("DELETE FROM projects WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    /// Set a project's sync status, assigning `remote_id` only when one is
    /// provided — an existing remote id is never cleared.
    pub async fn set_project_sync_status(
        &self,
        id: i64,
        status: SyncStatus,
        remote_id: Option<Uuid>,
    ) -> Result<()> {
        let rows =
            set_sync_status(&self.conn, "projects", id, status, remote_id).await?;
        if rows == 0 {
            return Err(Error::NotFound(format!("project {id}")));
        }
        Ok(())
    }

    /// Upsert a remote-origin project by remote id. The remote copy wins
    /// unconditionally; the record always lands `Synced`.
    pub async fn upsert_project_from_remote(
        &self,
        remote_id: Uuid,
        name: &str,
        created_at: i64,
        updated_at: i64,
    ) -> Result<i64> {
        let now = now_ms();
        let existing = self
            .lookup_by_remote_id("projects", remote_id)
            .await?;

        if let Some((local_id, status)) = existing {
            if status == SyncStatus::PendingUpdate {
                tracing::warn!(
                    project = local_id,
                    %remote_id,
                    "remote pull overwrites unflushed local project edits"
                );
            }
            self.conn
                .execute(
                    "UPDATE projects
                         SET name = ?, created_at = ?, updated_at = ?,
                             sync_status = 1, last_synced_at = ?
                     WHERE id = ?",
                    params![name, created_at, updated_at, now, local_id],
                )
                .await?;
            Ok(local_id)
        } else {
            self.conn
                .execute(
                    "INSERT INTO projects
                         (name, created_at, updated_at, remote_id, sync_status, last_synced_at)
                     VALUES (?, ?, ?, ?, 1, ?)",
                    params![name, created_at, updated_at, remote_id.to_string(), now],
                )
                .await?;
            Ok(self.conn.last_insert_rowid())
        }
    }

    /// Find a row's local id and status by remote id.
    pub(super) async fn lookup_by_remote_id(
        &self,
        table: &str,
        remote_id: Uuid,
    ) -> Result<Option<(i64, SyncStatus)>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT id, sync_status FROM {table} WHERE remote_id = ?"),
                [remote_id.to_string()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let id: i64 = row.get(0)?;
                let status = SyncStatus::from_i64(row.get(1)?)?;
                Ok(Some((id, status)))
            }
            None => Ok(None),
        }
    }
}

/// Shared UPDATE for the sync-status accessors. `last_synced_at` is only
/// written when the record lands `Synced`.
pub(super) async fn set_sync_status(
    conn: &libsql::Connection,
    table: &str,
    id: i64,
    status: SyncStatus,
    remote_id: Option<Uuid>,
) -> Result<u64> {
    let now = now_ms();
    let rows = match (remote_id, status == SyncStatus::Synced) {
        (Some(rid), true) => {
            conn.execute(
                &format!(
                    "UPDATE {table} SET sync_status = ?, remote_id = ?, last_synced_at = ?
                     WHERE id = ?"
                ),
                params![status.as_i64(), rid.to_string(), now, id],
            )
            .await?
        }
        (Some(rid), false) => {
            conn.execute(
                &format!("UPDATE {table} SET sync_status = ?, remote_id = ? WHERE id = ?"),
                params![status.as_i64(), rid.to_string(), id],
            )
            .await?
        }
        (None, true) => {
            conn.execute(
                &format!(
                    "UPDATE {table} SET sync_status = ?, last_synced_at = ? WHERE id = ?"
                ),
                params![status.as_i64(), now, id],
            )
            .await?
        }
        (None, false) => {
            conn.execute(
                &format!("UPDATE {table} SET sync_status = ? WHERE id = ?"),
                params![status.as_i64(), id],
            )
            .await?
        }
    };
    Ok(rows)
}

fn parse_project(row: &Row) -> Result<Project> {
    Ok(Project {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        sync: SyncMeta {
            remote_id: parse_remote_id(row.get(4)?)?,
            status: SyncStatus::from_i64(row.get(5)?)?,
            last_synced_at: row.get(6)?,
        },
    })
}
