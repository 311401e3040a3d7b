//! Durable watcher state.
//!
//! - [`types`]: in-memory state and the on-disk record shapes
//! - [`manager`]: load/save/migrate/reset against the config directory

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{LessonBackup, PersistedFlags, WatcherState};
