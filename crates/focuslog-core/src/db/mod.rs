//! Database layer for focuslog

mod connection;
mod migrations;
mod projects;
mod sessions;
mod store;
mod tasks;

pub use connection::Database;
pub use store::Store;
pub use tasks::RemoteTaskFields;
