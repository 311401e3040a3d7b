//! Persisted watcher state.
//!
//! The in-memory [`WatcherState`] is authoritative for the running process;
//! disk is a best-effort mirror so a restart picks up where the last run left
//! off. Save failures are logged and swallowed.
//!
//! A state file that fails to parse is treated as unrecoverable: every backup
//! artifact is deleted and the state returns to defaults.

use fs_err as fs;
use tracing::{debug, error, info, warn};

use crate::error::{Result, WatcherError};
use crate::storage::StoragePaths;
use crate::store;

use super::types::{LessonBackup, PersistedFlags, WatcherState};

pub struct StateManager {
    paths: StoragePaths,
    state: WatcherState,
}

impl StateManager {
    /// Default state, nothing read from disk.
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            state: WatcherState::default(),
        }
    }

    /// Loads persisted state, recovering from corruption by resetting.
    pub fn load(paths: StoragePaths) -> Self {
        let mut manager = Self::new(paths);
        match manager.read_persisted() {
            Ok(state) => {
                debug!(?state, "Loaded persisted watcher state");
                manager.state = state;
            }
            Err(err @ WatcherError::Parse { .. }) => {
                error!(
                    severity = "critical",
                    error = %err,
                    "Persisted state is corrupt; resetting to defaults"
                );
                manager.reset();
            }
            Err(err) => {
                error!(error = %err, "Failed to load persisted state; using defaults");
            }
        }
        manager
    }

    /// Reads the flag record first, then each backup artifact on its own.
    ///
    /// A backup file that exists but cannot be read (bad encoding, permissions)
    /// is logged and left on disk; the flags already read are kept so the
    /// channel never takes a second backup over it.
    fn read_persisted(&self) -> Result<WatcherState> {
        let mut state = WatcherState::default();

        if let Some(flags) = optional(store::read_json::<PersistedFlags>(
            &self.paths.state_file(),
        ))? {
            state.apply_flags(flags);
        }

        let original_path = self.paths.original_value_file();
        if let Some(text) = tolerate(store::read_text(&original_path), &original_path)? {
            let value = text.trim();
            if !value.is_empty() {
                state.original_value = Some(value.to_string());
            }
        }

        let lesson_path = self.paths.lesson_backup_file();
        if let Some(backup) =
            tolerate(store::read_json::<LessonBackup>(&lesson_path), &lesson_path)?
        {
            state.lesson_original_value = Some(backup.widgets);
        }

        Ok(state)
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WatcherState {
        &mut self.state
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Saving
    // ─────────────────────────────────────────────────────────────────────────────

    /// Persists the flag record and, if set, the process-channel original value.
    ///
    /// All four flags are written so a process-channel save never erases the
    /// lesson channel's flags.
    pub fn save(&self) {
        self.write_flags();

        if let Some(value) = &self.state.original_value {
            let path = self.paths.original_value_file();
            if let Err(err) = store::write_text_atomic(&path, value) {
                error!(error = %err, path = %path.display(), "Failed to save original value");
            }
        }
    }

    /// Persists the flag record and, if present, the lesson snapshot.
    pub fn save_lesson_state(&self) {
        self.write_flags();

        if let Some(widgets) = &self.state.lesson_original_value {
            let path = self.paths.lesson_backup_file();
            let backup = LessonBackup {
                widgets: widgets.clone(),
            };
            if let Err(err) = store::write_json_atomic(&path, &backup) {
                error!(error = %err, path = %path.display(), "Failed to save lesson backup");
            }
        }
    }

    fn write_flags(&self) {
        let path = self.paths.state_file();
        if let Err(err) = store::write_json_atomic(&path, &self.state.flags()) {
            error!(error = %err, path = %path.display(), "Failed to save watcher state");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Backup Artifacts
    // ─────────────────────────────────────────────────────────────────────────────

    /// Writes the process-channel backup. Errors propagate: `backup_done` must
    /// never be set without this file on disk.
    pub fn write_backup_value(&self, value: &str) -> Result<()> {
        store::write_text_atomic(&self.paths.original_value_file(), value)
    }

    /// Reads the process-channel backup from disk.
    pub fn read_backup_value(&self) -> Result<String> {
        let path = self.paths.original_value_file();
        match store::read_text(&path) {
            Ok(text) => Ok(text.trim().to_string()),
            Err(err) if err.is_not_found() => Err(WatcherError::BackupMissing(path)),
            Err(err) => Err(err),
        }
    }

    pub fn has_backup_value(&self) -> bool {
        self.paths.original_value_file().exists()
    }

    pub fn remove_backup_value(&self) {
        remove_artifact(&self.paths.original_value_file());
    }

    pub fn remove_lesson_backup(&self) {
        remove_artifact(&self.paths.lesson_backup_file());
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Migration and Reset
    // ─────────────────────────────────────────────────────────────────────────────

    /// Moves state files from the legacy plugin-root location into `config/`.
    ///
    /// Only moves a file when nothing exists at the new location. Failures are
    /// logged; the watcher starts either way.
    pub fn migrate_legacy_files(&self) {
        for (legacy, current) in self.paths.legacy_moves() {
            if !legacy.exists() || current.exists() {
                continue;
            }
            match fs::rename(&legacy, &current) {
                Ok(()) => info!(
                    from = %legacy.display(),
                    to = %current.display(),
                    "Migrated legacy state file"
                ),
                Err(err) => error!(
                    error = %err,
                    path = %legacy.display(),
                    "Failed to migrate legacy state file"
                ),
            }
        }

        for stale in self.paths.legacy_temp_files() {
            if stale.exists() {
                debug!(path = %stale.display(), "Removing stale legacy temp file");
                remove_artifact(&stale);
            }
        }
    }

    /// Deletes every persisted artifact and returns to default state.
    pub fn reset(&mut self) {
        for path in [
            self.paths.state_file(),
            self.paths.original_value_file(),
            self.paths.lesson_backup_file(),
        ] {
            remove_artifact(&path);
        }
        self.state = WatcherState::default();
        warn!("Watcher state reset to defaults");
    }
}

fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Like [`optional`], but an unreadable file is logged and read as absent.
/// Parse errors still propagate.
fn tolerate<T>(result: Result<T>, path: &std::path::Path) -> Result<Option<T>> {
    match optional(result) {
        Err(err @ WatcherError::Parse { .. }) => Err(err),
        Err(err) => {
            warn!(error = %err, path = %path.display(), "Backup file unreadable; keeping flags");
            Ok(None)
        }
        other => other,
    }
}

fn remove_artifact(path: &std::path::Path) {
    if let Err(err) = store::remove_if_exists(path) {
        error!(error = %err, path = %path.display(), "Failed to remove file");
    }
}
