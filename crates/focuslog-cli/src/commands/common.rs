use std::path::Path;

use chrono::DateTime;
use focuslog_core::db::{Database, Store};
use focuslog_core::models::{Project, Task, TaskPriority, TaskState};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ProjectListItem {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub sync_status: String,
}

#[derive(Debug, Serialize)]
pub struct TaskListItem {
    pub id: i64,
    pub project_id: Option<i64>,
    pub title: String,
    pub priority: String,
    pub state: String,
    pub due_date: Option<String>,
    pub sort_order: i64,
    pub sync_status: String,
}

pub async fn open_store(db_path: &Path) -> Result<Store, CliError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = Database::open(db_path).await?;
    Ok(Store::new(&db))
}

pub fn project_to_item(project: &Project) -> ProjectListItem {
    ProjectListItem {
        id: project.id.unwrap_or_default(),
        name: project.name.clone(),
        created_at: project.created_at,
        sync_status: sync_status_label(project.sync.status.is_pending()).to_string(),
    }
}

pub fn task_to_item(task: &Task) -> TaskListItem {
    TaskListItem {
        id: task.id.unwrap_or_default(),
        project_id: task.project_id,
        title: task.title.clone(),
        priority: priority_label(task.priority).to_string(),
        state: state_label(task.state).to_string(),
        due_date: task.due_date.map(format_millis),
        sort_order: task.sort_order,
        sync_status: sync_status_label(task.sync.status.is_pending()).to_string(),
    }
}

pub const fn priority_label(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "low",
        TaskPriority::Medium => "medium",
        TaskPriority::High => "high",
        TaskPriority::Urgent => "urgent",
    }
}

pub const fn state_label(state: TaskState) -> &'static str {
    match state {
        TaskState::Todo => "todo",
        TaskState::InProgress => "in-progress",
        TaskState::Done => "done",
    }
}

const fn sync_status_label(pending: bool) -> &'static str {
    if pending {
        "pending"
    } else {
        "synced"
    }
}

/// Render a Unix-millisecond timestamp for display.
pub fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis).map_or_else(
        || format!("@{millis}ms"),
        |datetime| datetime.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}
