//! Shared models for focuslog

mod project;
mod session;
mod sync_status;
mod task;

pub use project::Project;
pub use session::{EventKind, Session, SessionEvent};
pub use sync_status::{SyncMeta, SyncStatus};
pub use task::{Task, TaskPriority, TaskState};
