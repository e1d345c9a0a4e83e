//! Reconciliation engine.
//!
//! One cycle runs five sequential phases: pending creates (projects
//! then tasks), pending task updates, remote pull, session flush, and
//! session event batches. Each phase is collect-and-continue: a failing
//! record is logged and reported, never allowed to abort the cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::{RemoteTaskFields, Store};
use crate::error::{Error, Result};
use crate::models::{Session, SessionEvent, SyncStatus, TaskPriority, TaskState};
use crate::remote::types::{
    ProjectCreate, RemoteTask, SessionCreate, SessionEventBatch, SessionEventCreate,
    SessionUpdate, TaskCreate, TaskUpdate,
};
use crate::remote::RemoteApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Creates,
    Updates,
    Pull,
    Sessions,
    Events,
}

/// What happened to one record (or one batch) during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Synced,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub phase: Phase,
    pub entity: &'static str,
    pub local_id: Option<i64>,
    pub outcome: Outcome,
}

/// Per-record outcomes of one cycle, in phase order.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl CycleReport {
    fn record(&mut self, phase: Phase, entity: &'static str, local_id: Option<i64>, outcome: Outcome) {
        self.outcomes.push(RecordOutcome {
            phase,
            entity,
            local_id,
            outcome,
        });
    }

    #[must_use]
    pub fn synced(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Synced))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    /// Whether every attempted record succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|record| predicate(&record.outcome))
            .count()
    }
}

/// Which local action prompted a targeted session sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    Saved,
    EventRecorded,
    Completed,
}

/// Drives reconciliation between the local store and the remote service.
pub struct SyncEngine {
    store: Store,
    remote: Arc<dyn RemoteApi>,
}

impl SyncEngine {
    pub fn new(store: Store, remote: Arc<dyn RemoteApi>) -> Self {
        Self { store, remote }
    }

    /// Run one reconciliation cycle. `last_sync_at` is only advanced when
    /// every attempted record succeeded.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.push_creates(&mut report).await?;
        self.push_task_updates(&mut report).await?;
        self.pull(&mut report).await?;
        self.flush_sessions(&mut report).await?;
        self.flush_session_events(&mut report).await?;

        if report.is_clean() {
            self.store
                .set_last_sync_at(Utc::now().timestamp_millis())
                .await?;
        }
        tracing::info!(
            synced = report.synced(),
            skipped = report.skipped(),
            failed = report.failed(),
            "sync cycle finished"
        );
        Ok(report)
    }

    /// Targeted push for one session and its event backlog, invoked by the
    /// latency-sensitive call sites instead of waiting for a full cycle.
    pub async fn sync_session(
        &self,
        session_id: i64,
        change: SessionChange,
    ) -> Result<CycleReport> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
        tracing::debug!(session = session_id, ?change, "session sync requested");

        let mut report = CycleReport::default();
        if let Some(remote_id) = self.push_session(&session, &mut report).await? {
            self.flush_events(session_id, remote_id, &mut report).await?;
        }
        Ok(report)
    }

    /// Phase 1: upload records awaiting their first upload, projects before
    /// tasks so a task can reference its project's fresh remote id.
    async fn push_creates(&self, report: &mut CycleReport) -> Result<()> {
        for project in self.store.pending_projects().await? {
            let Some(id) = project.id else { continue };
            if !project.sync.status.needs_create() {
                // Edited projects have no remote mutation endpoint; the
                // pull phase reconciles them.
                continue;
            }

            let body = ProjectCreate {
                name: project.name.clone(),
            };
            match self.remote.create_project(&body).await {
                Ok(remote) => {
                    self.store
                        .set_project_sync_status(id, SyncStatus::Synced, Some(remote.id))
                        .await?;
                    report.record(Phase::Creates, "project", Some(id), Outcome::Synced);
                }
                Err(error) => {
                    tracing::warn!(project = id, %error, "project upload failed");
                    report.record(
                        Phase::Creates,
                        "project",
                        Some(id),
                        Outcome::Failed(error.to_string()),
                    );
                }
            }
        }

        for (task, project_remote_id) in self.store.pending_task_creates().await? {
            let Some(id) = task.id else { continue };
            if task.project_id.is_some() && project_remote_id.is_none() {
                report.record(
                    Phase::Creates,
                    "task",
                    Some(id),
                    Outcome::Skipped("project not yet uploaded".to_string()),
                );
                continue;
            }

            let body = TaskCreate {
                project_id: project_remote_id,
                title: task.title.clone(),
                estimate_minutes: task.estimate_minutes,
                priority: task.priority.as_i64(),
                status: task.state.as_i64(),
                due_date: task.due_date.and_then(DateTime::from_timestamp_millis),
                sort_order: task.sort_order,
            };
            match self.remote.create_task(&body).await {
                Ok(remote) => {
                    self.store
                        .set_task_sync_status(id, SyncStatus::Synced, Some(remote.id))
                        .await?;
                    report.record(Phase::Creates, "task", Some(id), Outcome::Synced);
                }
                Err(error) => {
                    tracing::warn!(task = id, %error, "task upload failed");
                    report.record(
                        Phase::Creates,
                        "task",
                        Some(id),
                        Outcome::Failed(error.to_string()),
                    );
                }
            }
        }
        Ok(())
    }

    /// Phase 2: PATCH previously synced tasks with unflushed local edits.
    async fn push_task_updates(&self, report: &mut CycleReport) -> Result<()> {
        for task in self.store.pending_task_updates().await? {
            let (Some(id), Some(remote_id)) = (task.id, task.sync.remote_id) else {
                continue;
            };

            let project_remote_id = match task.project_id {
                Some(pid) => self
                    .store
                    .get_project(pid)
                    .await?
                    .and_then(|project| project.sync.remote_id),
                None => None,
            };
            let body = TaskUpdate {
                project_id: project_remote_id,
                title: Some(task.title.clone()),
                estimate_minutes: task.estimate_minutes,
                priority: Some(task.priority.as_i64()),
                status: Some(task.state.as_i64()),
                due_date: task.due_date.and_then(DateTime::from_timestamp_millis),
                sort_order: Some(task.sort_order),
            };

            match self.remote.update_task(remote_id, &body).await {
                Ok(_) => {
                    self.store
                        .set_task_sync_status(id, SyncStatus::Synced, None)
                        .await?;
                    report.record(Phase::Updates, "task", Some(id), Outcome::Synced);
                }
                Err(error) => {
                    tracing::warn!(task = id, %error, "task update failed");
                    report.record(
                        Phase::Updates,
                        "task",
                        Some(id),
                        Outcome::Failed(error.to_string()),
                    );
                }
            }
        }
        Ok(())
    }

    /// Phase 3: pull the remote collections and upsert by remote id.
    /// Last-writer-wins; the store logs when a pull clobbers local edits.
    async fn pull(&self, report: &mut CycleReport) -> Result<()> {
        match self.remote.list_projects().await {
            Ok(projects) => {
                for remote in projects {
                    let local_id = self
                        .store
                        .upsert_project_from_remote(
                            remote.id,
                            &remote.name,
                            remote.created_at.timestamp_millis(),
                            remote.updated_at.timestamp_millis(),
                        )
                        .await?;
                    report.record(Phase::Pull, "project", Some(local_id), Outcome::Synced);
                }
            }
            Err(error) => {
                tracing::warn!(%error, "project pull failed");
                report.record(
                    Phase::Pull,
                    "project",
                    None,
                    Outcome::Failed(error.to_string()),
                );
            }
        }

        match self.remote.list_tasks().await {
            Ok(tasks) => {
                for remote in tasks {
                    match task_fields(&remote) {
                        Ok(fields) => {
                            let local_id = self.store.upsert_task_from_remote(fields).await?;
                            report.record(Phase::Pull, "task", Some(local_id), Outcome::Synced);
                        }
                        Err(error) => {
                            tracing::warn!(remote_id = %remote.id, %error, "malformed remote task");
                            report.record(
                                Phase::Pull,
                                "task",
                                None,
                                Outcome::Failed(error.to_string()),
                            );
                        }
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%error, "task pull failed");
                report.record(Phase::Pull, "task", None, Outcome::Failed(error.to_string()));
            }
        }
        Ok(())
    }

    /// Phase 4: push pending sessions, POST for new ones and PATCH for
    /// previously synced ones.
    async fn flush_sessions(&self, report: &mut CycleReport) -> Result<()> {
        for session in self.store.pending_sessions().await? {
            self.push_session(&session, report).await?;
        }
        Ok(())
    }

    /// Push one session; returns its remote id when the remote copy is
    /// reachable so the caller can flush events.
    async fn push_session(
        &self,
        session: &Session,
        report: &mut CycleReport,
    ) -> Result<Option<Uuid>> {
        let Some(id) = session.id else { return Ok(None) };

        match session.sync.remote_id {
            None => {
                let body = match session_create(session) {
                    Ok(body) => body,
                    Err(error) => {
                        report.record(
                            Phase::Sessions,
                            "session",
                            Some(id),
                            Outcome::Failed(error.to_string()),
                        );
                        return Ok(None);
                    }
                };
                match self.remote.create_session(&body).await {
                    Ok(remote) => {
                        self.store
                            .set_session_sync_status(id, SyncStatus::Synced, Some(remote.id))
                            .await?;
                        report.record(Phase::Sessions, "session", Some(id), Outcome::Synced);
                        Ok(Some(remote.id))
                    }
                    Err(error) => {
                        tracing::warn!(session = id, %error, "session upload failed");
                        report.record(
                            Phase::Sessions,
                            "session",
                            Some(id),
                            Outcome::Failed(error.to_string()),
                        );
                        Ok(None)
                    }
                }
            }
            Some(remote_id) => {
                if !session.sync.status.is_pending() {
                    return Ok(Some(remote_id));
                }
                match self.remote.update_session(remote_id, &session_update(session)).await {
                    Ok(_) => {
                        self.store
                            .set_session_sync_status(id, SyncStatus::Synced, None)
                            .await?;
                        report.record(Phase::Sessions, "session", Some(id), Outcome::Synced);
                    }
                    Err(error) => {
                        tracing::warn!(session = id, %error, "session update failed");
                        report.record(
                            Phase::Sessions,
                            "session",
                            Some(id),
                            Outcome::Failed(error.to_string()),
                        );
                    }
                }
                Ok(Some(remote_id))
            }
        }
    }

    /// Phase 5: batch-upload event backlogs for remote-backed sessions.
    async fn flush_session_events(&self, report: &mut CycleReport) -> Result<()> {
        for (session_id, remote_id) in self.store.sessions_with_unsynced_events().await? {
            self.flush_events(session_id, remote_id, report).await?;
        }
        Ok(())
    }

    /// Upload one session's unsynced events in a single batch. All events
    /// transition together or not at all.
    async fn flush_events(
        &self,
        session_id: i64,
        session_remote_id: Uuid,
        report: &mut CycleReport,
    ) -> Result<()> {
        let events = self.store.unsynced_events(session_id).await?;
        if events.is_empty() {
            return Ok(());
        }

        let bodies: Result<Vec<SessionEventCreate>> = events.iter().map(event_create).collect();
        let batch = match bodies {
            Ok(events) => SessionEventBatch { events },
            Err(error) => {
                report.record(
                    Phase::Events,
                    "session_events",
                    Some(session_id),
                    Outcome::Failed(error.to_string()),
                );
                return Ok(());
            }
        };

        match self
            .remote
            .create_session_events(session_remote_id, &batch)
            .await
        {
            Ok(remote_events) => {
                if remote_events.len() != events.len() {
                    tracing::warn!(
                        session = session_id,
                        sent = events.len(),
                        received = remote_events.len(),
                        "event batch response size mismatch"
                    );
                    report.record(
                        Phase::Events,
                        "session_events",
                        Some(session_id),
                        Outcome::Failed("event batch response size mismatch".to_string()),
                    );
                    return Ok(());
                }

                let assignments: Vec<(i64, Uuid)> = events
                    .iter()
                    .filter_map(|event| event.id)
                    .zip(remote_events.iter().map(|remote| remote.id))
                    .collect();
                self.store.mark_events_synced(&assignments).await?;
                report.record(Phase::Events, "session_events", Some(session_id), Outcome::Synced);
            }
            Err(error) => {
                tracing::warn!(session = session_id, %error, "event batch upload failed");
                report.record(
                    Phase::Events,
                    "session_events",
                    Some(session_id),
                    Outcome::Failed(error.to_string()),
                );
            }
        }
        Ok(())
    }
}

fn task_fields(remote: &RemoteTask) -> Result<RemoteTaskFields> {
    Ok(RemoteTaskFields {
        remote_id: remote.id,
        project_remote_id: remote.project_id,
        title: remote.title.clone(),
        estimate_minutes: remote.estimate_minutes,
        priority: TaskPriority::from_i64(remote.priority)?,
        state: TaskState::from_i64(remote.status)?,
        due_date: remote.due_date.map(|date| date.timestamp_millis()),
        sort_order: remote.sort_order,
        created_at: remote.created_at.timestamp_millis(),
        updated_at: remote.updated_at.timestamp_millis(),
    })
}

fn session_create(session: &Session) -> Result<SessionCreate> {
    Ok(SessionCreate {
        start_time: millis_to_datetime(session.start_time)?,
        end_time: session.end_time.and_then(DateTime::from_timestamp_millis),
        duration_seconds: session.duration_seconds,
        focused_seconds: session.focused_seconds,
        distraction_count: session.distraction_count,
        is_complete: session.is_complete,
    })
}

fn session_update(session: &Session) -> SessionUpdate {
    SessionUpdate {
        end_time: session.end_time.and_then(DateTime::from_timestamp_millis),
        duration_seconds: Some(session.duration_seconds),
        focused_seconds: Some(session.focused_seconds),
        distraction_count: Some(session.distraction_count),
        is_complete: Some(session.is_complete),
    }
}

fn event_create(event: &SessionEvent) -> Result<SessionEventCreate> {
    Ok(SessionEventCreate {
        event_type: event.kind.as_str().to_string(),
        timestamp: millis_to_datetime(event.timestamp)?,
        app_name: event.app_name.clone(),
        duration_seconds: event.duration_seconds,
        metadata_json: event.metadata.clone(),
    })
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::InvalidInput(format!("timestamp {millis} out of range")))
}
