//! # watcher-core
//!
//! Watches for a named process and a host-reported lesson label, and swaps
//! entries in the host's `config/widget.json` while those conditions hold,
//! always keeping a backup to restore from.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. The host calls [`Watcher::update`] once per tick.
//! - **Level-triggered**: Every action is idempotent; a missed tick self-corrects.
//! - **Crash-safe persistence**: All writes go through temp file + rename ([`store`]).
//! - **Fail toward the last known-good document**: Errors abort the current
//!   action only and are retried on the next tick.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use watcher_core::{StaticContext, StoragePaths, Watcher, WatcherConfig};
//!
//! let paths = StoragePaths::with_roots(plugin_dir, base_dir.clone());
//! let mut watcher = Watcher::new(WatcherConfig::default(), paths);
//! let ctx = StaticContext { base_directory: base_dir, current_lesson: None };
//! loop {
//!     watcher.update(&ctx);
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//! }
//! ```

pub mod channel;
pub mod config;
pub mod detect;
pub mod document;
pub mod engine;
pub mod error;
pub mod state;
pub mod storage;
pub mod store;

pub use channel::{ChannelOutcome, LessonChannel, ProcessChannel, SkipReason};
pub use config::{ProcessMatchMode, WatcherConfig};
pub use detect::{LessonTracker, ProcessDetector, ProcessLister, SysinfoProcessLister};
pub use document::WidgetDocument;
pub use engine::{
    Action, ActionStatus, Clock, HostContext, StaticContext, SystemClock, TickReport, Watcher,
};
pub use error::{Result, WatcherError};
pub use state::{PersistedFlags, StateManager, WatcherState};
pub use storage::StoragePaths;
