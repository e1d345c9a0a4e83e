//! Focus session and session event models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SyncMeta;
use crate::error::Error;

/// A focus session. Owns its events (cascade delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Local identity, assigned by the store on insert.
    pub id: Option<i64>,
    /// Session start (Unix ms)
    pub start_time: i64,
    /// Session end (Unix ms), unset while in progress
    pub end_time: Option<i64>,
    pub duration_seconds: i64,
    pub focused_seconds: i64,
    pub distraction_count: i64,
    pub is_complete: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub sync: SyncMeta,
}

impl Session {
    /// Start a new session now.
    #[must_use]
    pub fn start() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: None,
            start_time: now,
            end_time: None,
            duration_seconds: 0,
            focused_seconds: 0,
            distraction_count: 0,
            is_complete: false,
            created_at: now,
            updated_at: now,
            sync: SyncMeta::default(),
        }
    }
}

/// Kind of event recorded during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Start,
    Pause,
    Resume,
    Stop,
    TaskComplete,
    Distraction,
    Idle,
}

impl EventKind {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Pause => "PAUSE",
            Self::Resume => "RESUME",
            Self::Stop => "STOP",
            Self::TaskComplete => "TASK_COMPLETE",
            Self::Distraction => "DISTRACTION",
            Self::Idle => "IDLE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START" => Ok(Self::Start),
            "PAUSE" => Ok(Self::Pause),
            "RESUME" => Ok(Self::Resume),
            "STOP" => Ok(Self::Stop),
            "TASK_COMPLETE" => Ok(Self::TaskComplete),
            "DISTRACTION" => Ok(Self::Distraction),
            "IDLE" => Ok(Self::Idle),
            other => Err(Error::Database(format!("unknown event kind {other:?}"))),
        }
    }
}

/// A single event within a session (high-frequency, batch-uploaded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Local identity, assigned by the store on insert.
    pub id: Option<i64>,
    /// Local session identity (FK, cascade on session delete).
    pub session_id: i64,
    pub kind: EventKind,
    /// Event timestamp (Unix ms)
    pub timestamp: i64,
    pub app_name: Option<String>,
    pub duration_seconds: Option<i64>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
    pub sync: SyncMeta,
}

impl SessionEvent {
    /// Create a new, not-yet-persisted event for a stored session.
    #[must_use]
    pub fn new(session_id: i64, kind: EventKind) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: None,
            session_id,
            kind,
            timestamp: now,
            app_name: None,
            duration_seconds: None,
            metadata: None,
            created_at: now,
            sync: SyncMeta::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn event_kind_roundtrips_wire_form() {
        for kind in [
            EventKind::Start,
            EventKind::Pause,
            EventKind::Resume,
            EventKind::Stop,
            EventKind::TaskComplete,
            EventKind::Distraction,
            EventKind::Idle,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
        assert!("SOMETHING_ELSE".parse::<EventKind>().is_err());
    }

    #[test]
    fn started_session_is_incomplete() {
        let session = Session::start();
        assert!(!session.is_complete);
        assert!(session.end_time.is_none());
        assert_eq!(session.duration_seconds, 0);
    }
}
