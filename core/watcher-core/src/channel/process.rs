//! Process channel: terminal-slot swap with a single-value backup.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::document::WidgetDocument;
use crate::error::{Result, WatcherError};
use crate::state::StateManager;

use super::ChannelOutcome;

pub struct ProcessChannel {
    /// Value written into the terminal slot while the process runs.
    modified_value: String,
    target: PathBuf,
}

impl ProcessChannel {
    pub fn new(modified_value: impl Into<String>, target: PathBuf) -> Self {
        Self {
            modified_value: modified_value.into(),
            target,
        }
    }

    /// Saves the current terminal value, once.
    pub fn create_backup(&self, manager: &mut StateManager) -> Result<ChannelOutcome> {
        if manager.state().backup_done {
            if manager.has_backup_value() {
                return Ok(ChannelOutcome::Unchanged);
            }
            warn!("Backup flag set but backup file is gone; taking a new backup");
        }

        let doc = WidgetDocument::load(&self.target)?;
        let original = doc.terminal_widget()?;
        if original.trim().is_empty() {
            return Err(WatcherError::InvalidConfig {
                path: self.target.clone(),
                reason: "terminal widget is blank".to_string(),
            });
        }

        // The terminal already shows our value, so it is not an original. Keep
        // whatever backup is on disk; refuse if it cannot be read.
        if original == self.modified_value && manager.has_backup_value() {
            let existing = manager.read_backup_value()?;
            if existing.is_empty() {
                return Err(WatcherError::InvalidConfig {
                    path: manager.paths().original_value_file(),
                    reason: "backup value is blank".to_string(),
                });
            }
            let state = manager.state_mut();
            state.original_value = Some(existing.clone());
            state.backup_done = true;
            manager.save();
            warn!(original = %existing, "Adopted existing backup; terminal already modified");
            return Ok(ChannelOutcome::Applied);
        }

        manager.write_backup_value(&original)?;
        let state = manager.state_mut();
        state.original_value = Some(original.clone());
        state.backup_done = true;
        manager.save();

        info!(original = %original, "Backed up terminal widget");
        Ok(ChannelOutcome::Applied)
    }

    /// Writes the modified value into the terminal slot.
    pub fn apply_modification(&self, manager: &mut StateManager) -> Result<ChannelOutcome> {
        self.create_backup(manager)?;

        let mut doc = WidgetDocument::load(&self.target)?;
        if doc.terminal_widget()? == self.modified_value {
            if !manager.state().process_modified {
                manager.state_mut().process_modified = true;
                manager.save();
            }
            return Ok(ChannelOutcome::Unchanged);
        }

        doc.set_terminal_widget(&self.modified_value)?;
        doc.save()?;

        manager.state_mut().process_modified = true;
        manager.save();
        info!(value = %self.modified_value, "Terminal widget modified");
        Ok(ChannelOutcome::Applied)
    }

    /// Puts the backed-up value back and discards the backup.
    pub fn restore(&self, manager: &mut StateManager) -> Result<ChannelOutcome> {
        let original = manager.read_backup_value()?;
        if original.is_empty() {
            return Err(WatcherError::InvalidConfig {
                path: manager.paths().original_value_file(),
                reason: "backup value is blank".to_string(),
            });
        }

        let mut doc = WidgetDocument::load(&self.target)?;
        let outcome = if doc.terminal_widget()? == original {
            ChannelOutcome::Unchanged
        } else {
            doc.set_terminal_widget(&original)?;
            doc.save()?;
            ChannelOutcome::Applied
        };

        let state = manager.state_mut();
        state.process_modified = false;
        state.backup_done = false;
        state.original_value = None;
        manager.save();
        manager.remove_backup_value();

        info!(original = %original, ?outcome, "Terminal widget restored");
        Ok(outcome)
    }

    /// Recovers the `process_modified` flag after a crash between writing the
    /// document and saving state. Returns true when the flag was recovered.
    pub fn reconcile(&self, manager: &mut StateManager) -> Result<bool> {
        let state = manager.state();
        if state.process_modified || !state.backup_done || !manager.has_backup_value() {
            return Ok(false);
        }

        let doc = WidgetDocument::load(&self.target)?;
        if doc.terminal_widget()? != self.modified_value {
            return Ok(false);
        }

        manager.state_mut().process_modified = true;
        manager.save();
        warn!("Found unrecorded terminal modification; marking channel modified");
        Ok(true)
    }
}
