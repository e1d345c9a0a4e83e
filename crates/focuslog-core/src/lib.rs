//! focuslog-core - Core library for focuslog
//!
//! Local-first data layer for a personal focus tracker: every read and
//! write hits the local database, and a background scheduler reconciles
//! with the remote service whenever the network allows it.

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;

pub use error::{Error, Result};
pub use models::{Project, Session, SessionEvent, SyncStatus, Task};
