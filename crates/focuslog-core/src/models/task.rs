//! Task model

use serde::{Deserialize, Serialize};

use super::SyncMeta;
use crate::error::{Error, Result};

/// Task priority, independent of sync status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Low),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            3 => Ok(Self::Urgent),
            other => Err(Error::Database(format!("unknown task priority {other}"))),
        }
    }
}

/// Task workflow state, independent of sync status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskState {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Todo),
            1 => Ok(Self::InProgress),
            2 => Ok(Self::Done),
            other => Err(Error::Database(format!("unknown task state {other}"))),
        }
    }
}

/// A task, optionally attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Local identity, assigned by the store on insert.
    pub id: Option<i64>,
    /// Local project identity (FK, `SET NULL` on project delete).
    pub project_id: Option<i64>,
    pub title: String,
    pub estimate_minutes: Option<i64>,
    pub priority: TaskPriority,
    pub state: TaskState,
    /// Due date (Unix ms)
    pub due_date: Option<i64>,
    /// Dense per-project ordering, reassigned on reorder.
    pub sort_order: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub sync: SyncMeta,
}

impl Task {
    /// Create a new, not-yet-persisted task.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: None,
            project_id: None,
            title: title.into(),
            estimate_minutes: None,
            priority: TaskPriority::default(),
            state: TaskState::default(),
            due_date: None,
            sort_order: 0,
            created_at: now,
            updated_at: now,
            sync: SyncMeta::default(),
        }
    }

    #[must_use]
    pub fn with_project(mut self, project_id: i64) -> Self {
        self.project_id = Some(project_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn priority_and_state_roundtrip() {
        for priority in [
            TaskPriority::Low,
            TaskPriority::Medium,
            TaskPriority::High,
            TaskPriority::Urgent,
        ] {
            assert_eq!(TaskPriority::from_i64(priority.as_i64()).unwrap(), priority);
        }
        for state in [TaskState::Todo, TaskState::InProgress, TaskState::Done] {
            assert_eq!(TaskState::from_i64(state.as_i64()).unwrap(), state);
        }
        assert!(TaskPriority::from_i64(9).is_err());
        assert!(TaskState::from_i64(9).is_err());
    }

    #[test]
    fn new_task_has_defaults() {
        let task = Task::new("Write report").with_project(7);
        assert_eq!(task.project_id, Some(7));
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.state, TaskState::Todo);
        assert_eq!(task.sort_order, 0);
    }
}
