pub mod common;
pub mod project;
pub mod sync;
pub mod task;
