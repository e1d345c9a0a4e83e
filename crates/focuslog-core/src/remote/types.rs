//! Wire representations for the remote service.
//!
//! JSON bodies with snake_case keys and RFC3339 timestamps, matching the
//! remote service's documented request/response shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ProjectCreate {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteProject {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskCreate {
    pub project_id: Option<Uuid>,
    pub title: String,
    pub estimate_minutes: Option<i64>,
    pub priority: i64,
    pub status: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub sort_order: i64,
}

/// PATCH body; unset fields are omitted, not nulled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteTask {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub title: String,
    pub estimate_minutes: Option<i64>,
    pub priority: i64,
    pub status: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCreate {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub focused_seconds: i64,
    pub distraction_count: i64,
    pub is_complete: bool,
}

/// PATCH body; unset fields are omitted, not nulled.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focused_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distraction_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSession {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub focused_seconds: i64,
    pub distraction_count: i64,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEventCreate {
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub app_name: Option<String>,
    pub duration_seconds: Option<i64>,
    pub metadata_json: Option<serde_json::Value>,
}

/// One POST for a whole run of high-frequency events.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEventBatch {
    pub events: Vec<SessionEventCreate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSessionEvent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub app_name: Option<String>,
    pub duration_seconds: Option<i64>,
    pub metadata_json: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn task_update_omits_unset_fields() {
        let body = TaskUpdate {
            title: Some("t".to_string()),
            ..TaskUpdate::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "t" }));
    }

    #[test]
    fn remote_task_parses_snake_case_rfc3339() {
        let payload = serde_json::json!({
            "id": "9b2f6d6e-8f3a-4e5f-9e44-111111111111",
            "user_id": "9b2f6d6e-8f3a-4e5f-9e44-222222222222",
            "project_id": null,
            "title": "Write report",
            "estimate_minutes": 30,
            "priority": 2,
            "status": 0,
            "due_date": "2026-01-15T09:00:00Z",
            "sort_order": 3,
            "created_at": "2026-01-10T08:00:00Z",
            "updated_at": "2026-01-12T08:00:00Z"
        });

        let task: RemoteTask = serde_json::from_value(payload).unwrap();
        assert_eq!(task.title, "Write report");
        assert_eq!(task.priority, 2);
        assert!(task.project_id.is_none());
        assert_eq!(task.due_date.unwrap().to_rfc3339(), "2026-01-15T09:00:00+00:00");
    }
}
