//! Watcher configuration.
//!
//! Loaded from `<plugin_dir>/config/watcher.toml`. Every key is optional; a
//! missing file yields [`WatcherConfig::default`].
//!
//! ```toml
//! process_name = "lx-music-desktop.exe"
//! process_match_mode = "exact"      # or "substring"
//! check_interval_secs = 3.0
//! modified_value = "lx-music-lyrics.ui"
//!
//! enable_lesson_channel = true
//! lesson_triggers = ["Subject_1", "Subject_2", "Subject_3"]
//! lesson_source_widget = "example-1.ui"
//! lesson_target_widget = "example-2.ui"
//! debounce_secs = 4.0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatcherError};

/// How a running process name is compared against `process_name`.
/// Both policies ignore case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMatchMode {
    #[default]
    Exact,
    Substring,
}

impl ProcessMatchMode {
    /// `target` must already be lowercase.
    pub fn matches(self, candidate: &str, target: &str) -> bool {
        let candidate = candidate.to_lowercase();
        match self {
            ProcessMatchMode::Exact => candidate == target,
            ProcessMatchMode::Substring => candidate.contains(target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub process_name: String,
    pub process_match_mode: ProcessMatchMode,
    pub check_interval_secs: f64,
    /// Value written into the terminal slot while the process runs.
    pub modified_value: String,

    pub enable_lesson_channel: bool,
    pub lesson_triggers: Vec<String>,
    pub lesson_source_widget: String,
    pub lesson_target_widget: String,
    pub debounce_secs: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            process_name: "lx-music-desktop.exe".to_string(),
            process_match_mode: ProcessMatchMode::Exact,
            check_interval_secs: 3.0,
            modified_value: "lx-music-lyrics.ui".to_string(),
            enable_lesson_channel: true,
            lesson_triggers: vec![
                "Subject_1".to_string(),
                "Subject_2".to_string(),
                "Subject_3".to_string(),
            ],
            lesson_source_widget: "example-1.ui".to_string(),
            lesson_target_widget: "example-2.ui".to_string(),
            debounce_secs: 4.0,
        }
    }
}

impl WatcherConfig {
    /// Loads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs_err::read_to_string(path)
            .map_err(|e| WatcherError::from_io(path, format!("reading {}", path.display()), e))?;
        let config: WatcherConfig =
            toml::from_str(&content).map_err(|e| WatcherError::ConfigMalformed {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;

        config.validate().map_err(|details| WatcherError::ConfigMalformed {
            path: path.to_path_buf(),
            details,
        })?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.process_name.trim().is_empty() {
            return Err("process_name must not be empty".to_string());
        }
        if self.modified_value.trim().is_empty() {
            return Err("modified_value must not be empty".to_string());
        }
        if !is_valid_secs(self.check_interval_secs) {
            return Err(format!(
                "check_interval_secs must be a non-negative number, got {}",
                self.check_interval_secs
            ));
        }
        if !is_valid_secs(self.debounce_secs) {
            return Err(format!(
                "debounce_secs must be a non-negative number, got {}",
                self.debounce_secs
            ));
        }
        if self.enable_lesson_channel {
            if self.lesson_source_widget.is_empty() || self.lesson_target_widget.is_empty() {
                return Err("lesson widget markers must not be empty".to_string());
            }
            if self.lesson_source_widget == self.lesson_target_widget {
                return Err("lesson_source_widget and lesson_target_widget must differ".to_string());
            }
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        secs_to_duration(self.check_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        secs_to_duration(self.debounce_secs)
    }
}

fn is_valid_secs(secs: f64) -> bool {
    secs.is_finite() && secs >= 0.0
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}
