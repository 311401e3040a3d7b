//! Condition detectors feeding the orchestrator.

mod lesson;
mod process;

pub use lesson::LessonTracker;
pub use process::{ProcessDetector, ProcessLister, SysinfoProcessLister};
