use serde::{Deserialize, Serialize};

/// On-disk shape of `plugin_state.json`.
///
/// Missing or unknown keys fall back to defaults so older and newer files
/// both load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedFlags {
    pub modified: bool,
    pub backup_done: bool,
    pub lesson_modified: bool,
    pub lesson_backup_done: bool,
}

/// On-disk shape of `lesson_backup.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LessonBackup {
    pub widgets: Vec<String>,
}

/// Durable watcher state for both channels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherState {
    /// Process channel has an active, unreverted modification.
    pub process_modified: bool,
    /// `original_value.txt` holds the pre-modification terminal value.
    pub backup_done: bool,
    pub original_value: Option<String>,

    pub lesson_modified: bool,
    pub lesson_backup_done: bool,
    /// Full widget list captured before the lesson swap.
    pub lesson_original_value: Option<Vec<String>>,
}

impl WatcherState {
    pub fn flags(&self) -> PersistedFlags {
        PersistedFlags {
            modified: self.process_modified,
            backup_done: self.backup_done,
            lesson_modified: self.lesson_modified,
            lesson_backup_done: self.lesson_backup_done,
        }
    }

    pub fn apply_flags(&mut self, flags: PersistedFlags) {
        self.process_modified = flags.modified;
        self.backup_done = flags.backup_done;
        self.lesson_modified = flags.lesson_modified;
        self.lesson_backup_done = flags.lesson_backup_done;
    }
}
