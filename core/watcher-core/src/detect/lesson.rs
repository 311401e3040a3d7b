//! Lesson label tracking with debounce.
//!
//! The host reports its current lesson label every tick. Labels can flap
//! while the host's schedule settles, so the lesson channel is only evaluated
//! once the label has been stable for longer than the debounce window.

use std::time::{Duration, Instant};

use tracing::debug;

pub struct LessonTracker {
    triggers: Vec<String>,
    debounce: Duration,
    current: Option<String>,
    last_change: Option<Instant>,
}

impl LessonTracker {
    pub fn new(triggers: Vec<String>, debounce: Duration) -> Self {
        Self {
            triggers,
            debounce,
            current: None,
            last_change: None,
        }
    }

    /// Records `label`; returns true when it differs from the stored label.
    ///
    /// The very first report counts as a change, so the channel waits one
    /// debounce window after startup.
    pub fn check_lesson_change(&mut self, label: &str, now: Instant) -> bool {
        if self.current.as_deref() == Some(label) {
            return false;
        }
        debug!(lesson = label, "Lesson label changed");
        self.current = Some(label.to_string());
        self.last_change = Some(now);
        true
    }

    /// Stored label is one of the triggers.
    pub fn condition_met(&self) -> bool {
        self.current
            .as_deref()
            .is_some_and(|label| self.triggers.iter().any(|t| t == label))
    }

    /// More than `debounce` has passed since the last label change.
    pub fn debounce_elapsed(&self, now: Instant) -> bool {
        match self.last_change {
            Some(changed) => now.saturating_duration_since(changed) > self.debounce,
            None => true,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}
