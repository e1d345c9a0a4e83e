//! Task store operations

use libsql::{params, Row};
use uuid::Uuid;

use super::projects::set_sync_status;
use super::store::{now_ms, parse_remote_id, Store};
use crate::error::{Error, Result};
use crate::models::{SyncMeta, SyncStatus, Task, TaskPriority, TaskState};

const TASK_COLUMNS: &str = "id, project_id, title, estimate_minutes, priority, state, due_date, \
     sort_order, created_at, updated_at, remote_id, sync_status, last_synced_at";

/// Remote-origin task fields, resolved against local project identities
/// during upsert. Built by the sync engine from the wire representation.
#[derive(Debug, Clone)]
pub struct RemoteTaskFields {
    pub remote_id: Uuid,
    pub project_remote_id: Option<Uuid>,
    pub title: String,
    pub estimate_minutes: Option<i64>,
    pub priority: TaskPriority,
    pub state: TaskState,
    pub due_date: Option<i64>,
    pub sort_order: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Store {
    /// Insert or update a task, refreshing `updated_at`. New tasks are
    /// appended to their project's ordering; a local edit to a synced task
    /// moves it back to `PendingUpdate`.
    pub async fn save_task(&self, task: &mut Task) -> Result<()> {
        let now = now_ms();
        task.updated_at = now;

        match task.id {
            None => {
                task.sort_order = self.next_sort_order(task.project_id).await?;
                self.conn
                    .execute(
                        "INSERT INTO tasks
                             (project_id, title, estimate_minutes, priority, state, due_date,
                              sort_order, created_at, updated_at,
                              remote_id, sync_status, last_synced_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                        params![
                            task.project_id,
                            task.title.clone(),
                            task.estimate_minutes,
                            task.priority.as_i64(),
                            task.state.as_i64(),
                            task.due_date,
                            task.sort_order,
                            task.created_at,
                            now,
                            task.sync.remote_id.map(|id| id.to_string()),
                            task.sync.status.as_i64(),
                            task.sync.last_synced_at,
                        ],
                    )
                    .await?;
                task.id = Some(self.conn.last_insert_rowid());
            }
            Some(id) => {
                if task.sync.status == SyncStatus::Synced {
                    task.sync.status = SyncStatus::PendingUpdate;
                }
                let rows = self
                    .conn
                    .execute(
                        "UPDATE tasks
                             SET project_id = ?, title = ?, estimate_minutes = ?, priority = ?,
                                 state = ?, due_date = ?, sort_order = ?, updated_at = ?,
                                 sync_status = ?
                         WHERE id = ?",
                        params![
                            task.project_id,
                            task.title.clone(),
                            task.estimate_minutes,
                            task.priority.as_i64(),
                            task.state.as_i64(),
                            task.due_date,
                            task.sort_order,
                            now,
                            task.sync.status.as_i64(),
                            id,
                        ],
                    )
                    .await?;
                if rows == 0 {
                    return Err(Error::NotFound(format!("task {id}")));
                }
            }
        }

        Ok(())
    }

    /// Fetch a task by local id.
    pub async fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
                [id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(parse_task(&row)?)),
            None => Ok(None),
        }
    }

    /// List tasks, in sort order. With a project filter only that project's
    /// tasks are returned; without one, every task.
    pub async fn list_tasks(&self, project_id: Option<i64>) -> Result<Vec<Task>> {
        let mut rows = match project_id {
            Some(pid) => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {TASK_COLUMNS} FROM tasks
                             WHERE project_id = ? ORDER BY sort_order, id"
                        ),
                        [pid],
                    )
                    .await?
            }
            None => {
                self.conn
                    .query(
                        &format!(
                            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY project_id, sort_order, id"
                        ),
                        (),
                    )
                    .await?
            }
        };

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(parse_task(&row)?);
        }
        Ok(tasks)
    }

    /// Reassign a project's task ordering densely, in one transaction.
    /// Reordered rows that were synced become `PendingUpdate`.
    pub async fn reorder_tasks(&self, project_id: Option<i64>, ordered_ids: &[i64]) -> Result<()> {
        let now = now_ms();
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        for (position, id) in ordered_ids.iter().enumerate() {
            let result = self
                .conn
                .execute(
                    "UPDATE tasks
                         SET sort_order = ?, updated_at = ?,
                             sync_status = CASE WHEN sync_status = 1 THEN 3 ELSE sync_status END
                     WHERE id = ? AND project_id IS ?",
                    params![position as i64, now, *id, project_id],
                )
                .await;

            match result {
                Ok(0) => {
                    self.conn.execute("ROLLBACK", ()).await.ok();
                    return Err(Error::NotFound(format!("task {id} in project reorder")));
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

    /// Tasks awaiting first upload (`Local` or `PendingUpload`), paired with
    /// their project's remote id when the project has one.
    pub async fn pending_task_creates(&self) -> Result<Vec<(Task, Option<Uuid>)>> {
        let columns = qualified_task_columns("t");
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {columns}, p.remote_id
                     FROM tasks t LEFT JOIN projects p ON t.project_id = p.id
                     WHERE t.sync_status IN (0, 2)
                     ORDER BY t.id"
                ),
                (),
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            let task = parse_task(&row)?;
            let project_remote_id = parse_remote_id(row.get(13)?)?;
            tasks.push((task, project_remote_id));
        }
        Ok(tasks)
    }

    /// Previously synced tasks with unflushed local edits.
    pub async fn pending_task_updates(&self) -> Result<Vec<Task>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE sync_status = 3 AND remote_id IS NOT NULL
                     ORDER BY id"
                ),
                (),
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(parse_task(&row)?);
        }
        Ok(tasks)
    }

    /// Hard-delete a task. Refused while the record awaits its first upload.
    pub async fn delete_task(&self, id: i64) -> Result<()> {
        let task = self
            .get_task(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("task {id}")))?;

        if task.sync.status.needs_create() {
            return Err(Error::InvalidInput(format!(
                "task {id} is pending upload and cannot be deleted"
            )));
        }

        self.conn
            .execute("DELETE FROM tasks WHERE id = ?", [id])
            .await?;
        Ok(())
    }

    /// Set a task's sync status; see [`Store::set_project_sync_status`].
    pub async fn set_task_sync_status(
        &self,
        id: i64,
        status: SyncStatus,
        remote_id: Option<Uuid>,
    ) -> Result<()> {
        let rows = set_sync_status(&self.conn, "tasks", id, status, remote_id).await?;
        if rows == 0 {
            return Err(Error::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    /// Upsert a remote-origin task by remote id. Last-writer-wins: remote
    /// fields overwrite local ones even for rows with unflushed edits.
    pub async fn upsert_task_from_remote(&self, fields: RemoteTaskFields) -> Result<i64> {
        let now = now_ms();

        let project_id = match fields.project_remote_id {
            Some(project_remote) => self
                .lookup_by_remote_id("projects", project_remote)
                .await?
                .map(|(id, _)| id),
            None => None,
        };

        let existing = self.lookup_by_remote_id("tasks", fields.remote_id).await?;

        if let Some((local_id, status)) = existing {
            if status == SyncStatus::PendingUpdate {
                tracing::warn!(
                    task = local_id,
                    remote_id = %fields.remote_id,
                    "remote pull overwrites unflushed local task edits"
                );
            }
            self.conn
                .execute(
                    "UPDATE tasks
                         SET project_id = ?, title = ?, estimate_minutes = ?, priority = ?,
                             state = ?, due_date = ?, sort_order = ?,
                             created_at = ?, updated_at = ?,
                             sync_status = 1, last_synced_at = ?
                     WHERE id = ?",
                    params![
                        project_id,
                        fields.title,
                        fields.estimate_minutes,
                        fields.priority.as_i64(),
                        fields.state.as_i64(),
                        fields.due_date,
                        fields.sort_order,
                        fields.created_at,
                        fields.updated_at,
                        now,
                        local_id,
                    ],
                )
                .await?;
            Ok(local_id)
        } else {
            self.conn
                .execute(
                    "INSERT INTO tasks
                         (project_id, title, estimate_minutes, priority, state, due_date,
                          sort_order, created_at, updated_at,
                          remote_id, sync_status, last_synced_at)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)",
                    params![
                        project_id,
                        fields.title,
                        fields.estimate_minutes,
                        fields.priority.as_i64(),
                        fields.state.as_i64(),
                        fields.due_date,
                        fields.sort_order,
                        fields.created_at,
                        fields.updated_at,
                        fields.remote_id.to_string(),
                        now,
                    ],
                )
                .await?;
            Ok(self.conn.last_insert_rowid())
        }
    }

    async fn next_sort_order(&self, project_id: Option<i64>) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks WHERE project_id IS ?",
                params![project_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }
}

fn qualified_task_columns(alias: &str) -> String {
    TASK_COLUMNS
        .split(", ")
        .map(|column| format!("{alias}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_task(row: &Row) -> Result<Task> {
    Ok(Task {
        id: Some(row.get(0)?),
        project_id: row.get(1)?,
        title: row.get(2)?,
        estimate_minutes: row.get(3)?,
        priority: TaskPriority::from_i64(row.get(4)?)?,
        state: TaskState::from_i64(row.get(5)?)?,
        due_date: row.get(6)?,
        sort_order: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        sync: SyncMeta {
            remote_id: parse_remote_id(row.get(10)?)?,
            status: SyncStatus::from_i64(row.get(11)?)?,
            last_synced_at: row.get(12)?,
        },
    })
}
