//! Per-record synchronization metadata.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Divergence tag between the local and the last known remote copy.
///
/// Persisted as an integer column; the numeric values are part of the
/// on-disk format and must not be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Created offline, upload never attempted.
    Local,
    /// Local copy matches the last known remote copy.
    Synced,
    /// Created or locally dirty, not yet sent.
    PendingUpload,
    /// Previously synced, locally modified since.
    PendingUpdate,
    /// Reserved: locally deleted, remote removal not yet propagated.
    /// No transition currently produces this state.
    PendingDelete,
    /// Reserved: local and remote diverged in a way that needs a decision.
    /// No transition currently produces this state.
    Conflicted,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Local => 0,
            Self::Synced => 1,
            Self::PendingUpload => 2,
            Self::PendingUpdate => 3,
            Self::PendingDelete => 4,
            Self::Conflicted => 5,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Self::Local),
            1 => Ok(Self::Synced),
            2 => Ok(Self::PendingUpload),
            3 => Ok(Self::PendingUpdate),
            4 => Ok(Self::PendingDelete),
            5 => Ok(Self::Conflicted),
            other => Err(Error::Database(format!("unknown sync status {other}"))),
        }
    }

    /// Any status other than `Synced` counts as pending.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        !matches!(self, Self::Synced)
    }

    /// Statuses picked up by the upload-creates phase.
    #[must_use]
    pub const fn needs_create(self) -> bool {
        matches!(self, Self::Local | Self::PendingUpload)
    }
}

/// Sync metadata attached to every syncable entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMeta {
    /// Identifier assigned by the remote service once the remote copy exists.
    pub remote_id: Option<Uuid>,
    pub status: SyncStatus,
    /// Unix-millisecond timestamp of the last successful sync of this record.
    pub last_synced_at: Option<i64>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Local
    }
}
