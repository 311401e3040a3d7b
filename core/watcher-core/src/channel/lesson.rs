//! Lesson channel: swaps a marker widget wherever it sits in the list.
//!
//! The marker can be at any index, so the backup is a snapshot of the whole
//! list rather than a single value.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::document::{find_widget, WidgetDocument};
use crate::error::Result;
use crate::state::StateManager;

use super::{ChannelOutcome, SkipReason};

pub struct LessonChannel {
    /// Marker present outside trigger lessons.
    source: String,
    /// Marker shown during trigger lessons.
    destination: String,
    target: PathBuf,
}

impl LessonChannel {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, target: PathBuf) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            target,
        }
    }

    /// Stores a copy of `widgets`, once.
    pub fn create_lesson_backup(
        &self,
        manager: &mut StateManager,
        widgets: &[String],
    ) -> ChannelOutcome {
        if manager.state().lesson_backup_done {
            return ChannelOutcome::Unchanged;
        }

        let state = manager.state_mut();
        state.lesson_original_value = Some(widgets.to_vec());
        state.lesson_backup_done = true;
        manager.save_lesson_state();

        info!(count = widgets.len(), "Backed up widget list for lesson");
        ChannelOutcome::Applied
    }

    pub fn modify_for_lesson(&self, manager: &mut StateManager) -> Result<ChannelOutcome> {
        let mut doc = WidgetDocument::load(&self.target)?;
        let mut widgets = doc.widgets()?;

        let Some(index) = find_widget(&widgets, &self.source) else {
            warn!(widget = %self.source, "Lesson source widget not found; skipping");
            return Ok(ChannelOutcome::Skipped(SkipReason::SourceMissing));
        };
        if find_widget(&widgets, &self.destination).is_some() {
            warn!(widget = %self.destination, "Lesson target widget already present; skipping");
            return Ok(ChannelOutcome::Skipped(SkipReason::TargetPresent));
        }

        self.create_lesson_backup(manager, &widgets);

        widgets[index] = self.destination.clone();
        doc.set_widgets(widgets);
        doc.save()?;

        manager.state_mut().lesson_modified = true;
        manager.save_lesson_state();
        info!(
            from = %self.source,
            to = %self.destination,
            index,
            "Lesson widget swapped"
        );
        Ok(ChannelOutcome::Applied)
    }

    /// Recovers `lesson_modified` after a crash between writing the document
    /// and saving state: the snapshot exists, and the destination marker sits
    /// where the snapshot had the source marker. Returns true when recovered.
    pub fn reconcile(&self, manager: &mut StateManager) -> Result<bool> {
        let state = manager.state();
        if state.lesson_modified || !state.lesson_backup_done {
            return Ok(false);
        }
        let Some(snapshot) = state.lesson_original_value.as_ref() else {
            return Ok(false);
        };

        let widgets = WidgetDocument::load(&self.target)?.widgets()?;
        let Some(index) = find_widget(&widgets, &self.destination) else {
            return Ok(false);
        };
        if snapshot.get(index) != Some(&self.source) {
            return Ok(false);
        }

        manager.state_mut().lesson_modified = true;
        manager.save_lesson_state();
        warn!(index, "Found unrecorded lesson swap; marking channel modified");
        Ok(true)
    }

    pub fn restore_for_lesson(&self, manager: &mut StateManager) -> Result<ChannelOutcome> {
        if !manager.state().lesson_backup_done {
            return Ok(ChannelOutcome::Skipped(SkipReason::NoBackup));
        }

        let mut doc = WidgetDocument::load(&self.target)?;
        let mut widgets = doc.widgets()?;

        let outcome = match find_widget(&widgets, &self.destination) {
            Some(index) => {
                widgets[index] = self.source.clone();
                doc.set_widgets(widgets);
                doc.save()?;
                ChannelOutcome::Applied
            }
            None => {
                warn!(widget = %self.destination, "Lesson target widget not found; nothing to restore");
                ChannelOutcome::Unchanged
            }
        };

        let state = manager.state_mut();
        state.lesson_modified = false;
        state.lesson_backup_done = false;
        state.lesson_original_value = None;
        manager.save_lesson_state();
        manager.remove_lesson_backup();

        info!(?outcome, "Lesson widget restored");
        Ok(outcome)
    }
}
