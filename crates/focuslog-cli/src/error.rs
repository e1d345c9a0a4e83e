use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] focuslog_core::Error),
    #[error(transparent)]
    Api(#[from] focuslog_core::remote::ApiError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Project name cannot be empty")]
    EmptyProjectName,
    #[error("Task title cannot be empty")]
    EmptyTaskTitle,
    #[error("Task not found: {0}")]
    TaskNotFound(i64),
    #[error("Invalid due date (expected RFC3339, e.g. 2026-09-01T09:00:00Z): {0}")]
    InvalidDueDate(String),
    #[error("Sync is not configured. Set FOCUSLOG_API_URL and FOCUSLOG_TOKEN.")]
    SyncNotConfigured,
}
