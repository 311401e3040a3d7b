//! Storage path management for the watcher.
//!
//! All file paths the watcher reads or writes are decided here:
//!
//! ```text
//! <plugin_dir>/
//! ├── config/
//! │   ├── plugin_state.json     # persisted flags
//! │   ├── original_value.txt    # process-channel backup
//! │   ├── lesson_backup.json    # lesson-channel backup
//! │   └── watcher.toml          # optional configuration
//! └── log/                      # daily log files
//!
//! <base_dir>/config/widget.json # target document (owned by the host)
//! ```
//!
//! Production code uses [`StoragePaths::default_for`]; tests use
//! [`StoragePaths::with_roots`] with temp directories.

use std::path::{Path, PathBuf};

use fs_err as fs;

use crate::error::{Result, WatcherError};

const STATE_FILE: &str = "plugin_state.json";
const ORIGINAL_VALUE_FILE: &str = "original_value.txt";
const LESSON_BACKUP_FILE: &str = "lesson_backup.json";
const CONFIG_FILE: &str = "watcher.toml";

#[derive(Debug, Clone)]
pub struct StoragePaths {
    /// Directory owned by the watcher (state, backups, logs).
    plugin_dir: PathBuf,
    /// Host base directory; the target document lives under it.
    base_dir: PathBuf,
}

impl StoragePaths {
    pub fn with_roots(plugin_dir: PathBuf, base_dir: PathBuf) -> Self {
        Self {
            plugin_dir,
            base_dir,
        }
    }

    /// Uses the platform data directory for watcher files, falling back to
    /// `./widget-watcher` when none is known.
    pub fn default_for(base_dir: PathBuf) -> Self {
        let plugin_dir = dirs::data_local_dir()
            .map(|d| d.join("widget-watcher"))
            .unwrap_or_else(|| PathBuf::from("widget-watcher"));
        Self::with_roots(plugin_dir, base_dir)
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn config_dir(&self) -> PathBuf {
        self.plugin_dir.join("config")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.plugin_dir.join("log")
    }

    /// Creates the config and log directories.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.config_dir(), self.log_dir()] {
            fs::create_dir_all(&dir).map_err(|e| {
                WatcherError::from_io(&dir, format!("creating {}", dir.display()), e)
            })?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Persisted State
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn state_file(&self) -> PathBuf {
        self.config_dir().join(STATE_FILE)
    }

    pub fn original_value_file(&self) -> PathBuf {
        self.config_dir().join(ORIGINAL_VALUE_FILE)
    }

    pub fn lesson_backup_file(&self) -> PathBuf {
        self.config_dir().join(LESSON_BACKUP_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILE)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Legacy Locations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Older releases kept state directly in the plugin directory.
    /// Returns `(legacy, current)` pairs to migrate.
    pub fn legacy_moves(&self) -> Vec<(PathBuf, PathBuf)> {
        vec![
            (self.plugin_dir.join(STATE_FILE), self.state_file()),
            (
                self.plugin_dir.join(ORIGINAL_VALUE_FILE),
                self.original_value_file(),
            ),
        ]
    }

    /// Fixed-name temp files written by older releases (`<stem>.tmp`).
    pub fn legacy_temp_files(&self) -> Vec<PathBuf> {
        vec![
            self.state_file().with_extension("tmp"),
            self.lesson_backup_file().with_extension("tmp"),
        ]
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Host Paths (shared with the host)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to the widget document the watcher mutates.
    pub fn target_document(&self) -> PathBuf {
        self.base_dir.join("config").join("widget.json")
    }
}
