//! Backup/restore channels.
//!
//! Two channels mutate the same widget document:
//!
//! - [`ProcessChannel`]: swaps the terminal slot while the watched process runs.
//!   Backs up the single value it replaces.
//! - [`LessonChannel`]: swaps a marker widget at whatever index it sits while
//!   the lesson condition holds. Backs up the whole list.
//!
//! Each channel owns disjoint state flags, so one channel's transition never
//! clobbers the other's.

mod lesson;
mod process;

pub use lesson::LessonChannel;
pub use process::ProcessChannel;

/// Result of a channel operation that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// The document or backup was written.
    Applied,
    /// Already in the requested state; nothing written to the document.
    Unchanged,
    /// Preconditions not met; no state changed.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The lesson source marker is not in the widget list.
    SourceMissing,
    /// The lesson target marker is already in the widget list.
    TargetPresent,
    /// No lesson backup exists to restore from.
    NoBackup,
}

impl ChannelOutcome {
    /// True when the channel reached the requested state.
    pub fn succeeded(self) -> bool {
        !matches!(self, ChannelOutcome::Skipped(_))
    }
}
