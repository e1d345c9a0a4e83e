//! Project model

use serde::{Deserialize, Serialize};

use super::SyncMeta;

/// A project grouping tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Local identity, assigned by the store on insert.
    pub id: Option<i64>,
    pub name: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    pub sync: SyncMeta,
}

impl Project {
    /// Create a new, not-yet-persisted project.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: None,
            name: name.into(),
            created_at: now,
            updated_at: now,
            sync: SyncMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncStatus;

    #[test]
    fn new_project_starts_local() {
        let project = Project::new("Deep work");
        assert!(project.id.is_none());
        assert_eq!(project.sync.status, SyncStatus::Local);
        assert_eq!(project.created_at, project.updated_at);
    }
}
