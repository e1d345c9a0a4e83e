//! In-memory remote double shared by the engine and scheduler tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::remote::types::{
    ProjectCreate, RemoteProject, RemoteSession, RemoteSessionEvent, RemoteTask, SessionCreate,
    SessionEventBatch, SessionUpdate, TaskCreate, TaskUpdate,
};
use crate::remote::{ApiError, ApiResult, RemoteApi};

/// Remote service double backed by plain vectors, with injectable failures
/// and an optional per-call delay for concurrency tests.
#[derive(Default)]
pub(crate) struct FakeRemote {
    pub projects: Mutex<Vec<RemoteProject>>,
    pub tasks: Mutex<Vec<RemoteTask>>,
    pub sessions: Mutex<Vec<RemoteSession>>,
    pub event_batches: Mutex<Vec<usize>>,
    pub fail_project_creates: AtomicBool,
    pub fail_task_updates: AtomicBool,
    pub fail_events: AtomicBool,
    pub fail_lists: AtomicBool,
    pub call_delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seed_project(&self, name: &str) -> Uuid {
        let now = Utc::now();
        let project = RemoteProject {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = project.id;
        self.projects.lock().unwrap().push(project);
        id
    }

    pub fn seed_task(&self, project_id: Option<Uuid>, title: &str) -> Uuid {
        let now = Utc::now();
        let task = RemoteTask {
            id: Uuid::new_v4(),
            project_id,
            title: title.to_string(),
            estimate_minutes: None,
            priority: 1,
            status: 0,
            due_date: None,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        };
        let id = task.id;
        self.tasks.lock().unwrap().push(task);
        id
    }

    async fn before_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.call_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn injected_failure() -> ApiError {
        ApiError::Server {
            status: 500,
            message: "injected failure".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl RemoteApi for FakeRemote {
    async fn create_project(&self, body: &ProjectCreate) -> ApiResult<RemoteProject> {
        self.before_call().await;
        if self.fail_project_creates.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        let now = Utc::now();
        let project = RemoteProject {
            id: Uuid::new_v4(),
            name: body.name.clone(),
            created_at: now,
            updated_at: now,
        };
        self.projects.lock().unwrap().push(project.clone());
        Ok(project)
    }

    async fn list_projects(&self) -> ApiResult<Vec<RemoteProject>> {
        self.before_call().await;
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn create_task(&self, body: &TaskCreate) -> ApiResult<RemoteTask> {
        self.before_call().await;
        let now = Utc::now();
        let task = RemoteTask {
            id: Uuid::new_v4(),
            project_id: body.project_id,
            title: body.title.clone(),
            estimate_minutes: body.estimate_minutes,
            priority: body.priority,
            status: body.status,
            due_date: body.due_date,
            sort_order: body.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: Uuid, body: &TaskUpdate) -> ApiResult<RemoteTask> {
        self.before_call().await;
        if self.fail_task_updates.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or(ApiError::Server {
                status: 404,
                message: "task not found".to_string(),
            })?;
        if let Some(project_id) = body.project_id {
            task.project_id = Some(project_id);
        }
        if let Some(title) = &body.title {
            task.title = title.clone();
        }
        if let Some(estimate) = body.estimate_minutes {
            task.estimate_minutes = Some(estimate);
        }
        if let Some(priority) = body.priority {
            task.priority = priority;
        }
        if let Some(status) = body.status {
            task.status = status;
        }
        if let Some(due_date) = body.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(sort_order) = body.sort_order {
            task.sort_order = sort_order;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn list_tasks(&self) -> ApiResult<Vec<RemoteTask>> {
        self.before_call().await;
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn create_session(&self, body: &SessionCreate) -> ApiResult<RemoteSession> {
        self.before_call().await;
        let now = Utc::now();
        let session = RemoteSession {
            id: Uuid::new_v4(),
            start_time: body.start_time,
            end_time: body.end_time,
            duration_seconds: body.duration_seconds,
            focused_seconds: body.focused_seconds,
            distraction_count: body.distraction_count,
            is_complete: body.is_complete,
            created_at: now,
            updated_at: now,
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn update_session(&self, id: Uuid, body: &SessionUpdate) -> ApiResult<RemoteSession> {
        self.before_call().await;
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|session| session.id == id)
            .ok_or(ApiError::Server {
                status: 404,
                message: "session not found".to_string(),
            })?;
        if let Some(end_time) = body.end_time {
            session.end_time = Some(end_time);
        }
        if let Some(duration) = body.duration_seconds {
            session.duration_seconds = duration;
        }
        if let Some(focused) = body.focused_seconds {
            session.focused_seconds = focused;
        }
        if let Some(distractions) = body.distraction_count {
            session.distraction_count = distractions;
        }
        if let Some(is_complete) = body.is_complete {
            session.is_complete = is_complete;
        }
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    async fn create_session_events(
        &self,
        session_id: Uuid,
        body: &SessionEventBatch,
    ) -> ApiResult<Vec<RemoteSessionEvent>> {
        self.before_call().await;
        if self.fail_events.load(Ordering::SeqCst) {
            return Err(ApiError::RateLimited);
        }
        self.event_batches.lock().unwrap().push(body.events.len());
        Ok(body
            .events
            .iter()
            .map(|event| RemoteSessionEvent {
                id: Uuid::new_v4(),
                session_id,
                event_type: event.event_type.clone(),
                timestamp: event.timestamp,
                app_name: event.app_name.clone(),
                duration_seconds: event.duration_seconds,
                metadata_json: event.metadata_json.clone(),
            })
            .collect())
    }
}
