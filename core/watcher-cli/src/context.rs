//! Host context for standalone runs.
//!
//! When no host process embeds the watcher, the lesson label comes from the
//! command line or from a file the host rewrites whenever the lesson changes.

use std::path::{Path, PathBuf};

use watcher_core::HostContext;

pub struct CliContext {
    base_directory: PathBuf,
    lesson: Option<String>,
    lesson_file: Option<PathBuf>,
}

impl CliContext {
    pub fn new(base_directory: PathBuf, lesson: Option<String>, lesson_file: Option<PathBuf>) -> Self {
        Self {
            base_directory,
            lesson,
            lesson_file,
        }
    }

    /// Re-reads the lesson file, if one was given. A missing or unreadable
    /// file reads as "no lesson".
    pub fn refresh(&mut self) {
        let Some(path) = &self.lesson_file else {
            return;
        };
        self.lesson = match fs_err::read_to_string(path) {
            Ok(text) => Some(text.trim().to_string()),
            Err(err) => {
                tracing::debug!(error = %err, "Lesson file unavailable");
                None
            }
        };
    }
}

impl HostContext for CliContext {
    fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn current_lesson(&self) -> Option<&str> {
        self.lesson.as_deref()
    }
}
