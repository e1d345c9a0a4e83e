//! Background sync: connectivity, backoff, the reconciliation engine, and
//! the scheduler that ties them together.

mod backoff;
mod connectivity;
mod engine;
mod scheduler;
#[cfg(test)]
pub(crate) mod testing;

pub use backoff::{Backoff, BackoffPolicy};
pub use connectivity::{Connectivity, ConnectivityMonitor};
pub use engine::{CycleReport, Outcome, Phase, RecordOutcome, SessionChange, SyncEngine};
pub use scheduler::{
    SchedulerConfig, SkipReason, SyncScheduler, SyncState, SyncTrigger, TriggerOutcome,
};
