//! Update orchestrator.
//!
//! [`Watcher::update`] is called once per host tick. Each tick:
//!
//! ```text
//! detect process ─┐
//! check lesson ───┼─► lesson channel (if debounce elapsed) ─► process channel
//! ```
//!
//! Per channel the state machine is two states:
//!
//! ```text
//! Idle ──(condition holds, action ok)──► Modified
//! Modified ──(condition gone, action ok)──► Idle
//! ```
//!
//! A failed action is logged and leaves state as it was. There is no retry
//! timer: the condition still holds on the next tick, so the action simply
//! runs again. The watcher is level-triggered and every action is idempotent.
//!
//! The target document is read-modify-written without a file lock. Only one
//! watcher may manage a given document.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::channel::{ChannelOutcome, LessonChannel, ProcessChannel};
use crate::config::WatcherConfig;
use crate::detect::{LessonTracker, ProcessDetector, ProcessLister, SysinfoProcessLister};
use crate::error::Result;
use crate::state::{StateManager, WatcherState};
use crate::storage::StoragePaths;

/// Time source, injectable for tests.
pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// What the watcher needs from its host.
pub trait HostContext {
    fn base_directory(&self) -> &Path;
    fn current_lesson(&self) -> Option<&str>;
}

/// Fixed host context.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    pub base_directory: PathBuf,
    pub current_lesson: Option<String>,
}

impl HostContext for StaticContext {
    fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn current_lesson(&self) -> Option<&str> {
        self.current_lesson.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Modify(ActionStatus),
    Restore(ActionStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Done(ChannelOutcome),
    Failed(String),
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub process_running: bool,
    pub lesson_condition: bool,
    pub debounce_elapsed: bool,
    pub lesson_action: Option<Action>,
    pub process_action: Option<Action>,
}

pub struct Watcher {
    config: WatcherConfig,
    manager: StateManager,
    detector: ProcessDetector,
    lessons: LessonTracker,
    process_channel: ProcessChannel,
    lesson_channel: LessonChannel,
    clock: Box<dyn Clock>,
    base_mismatch_logged: bool,
}

impl Watcher {
    /// Production watcher: `sysinfo` process listing and the system clock.
    pub fn new(config: WatcherConfig, paths: StoragePaths) -> Self {
        Self::with_capabilities(
            config,
            paths,
            Box::new(SysinfoProcessLister::new()),
            Box::new(SystemClock),
        )
    }

    /// Migrates legacy files, loads persisted state, and recovers a
    /// modification that was written but never recorded.
    pub fn with_capabilities(
        config: WatcherConfig,
        paths: StoragePaths,
        lister: Box<dyn ProcessLister>,
        clock: Box<dyn Clock>,
    ) -> Self {
        if let Err(err) = paths.ensure_dirs() {
            error!(error = %err, "Failed to create watcher directories");
        }

        StateManager::new(paths.clone()).migrate_legacy_files();
        let mut manager = StateManager::load(paths.clone());

        let target = paths.target_document();
        let process_channel = ProcessChannel::new(config.modified_value.clone(), target.clone());
        let lesson_channel = LessonChannel::new(
            config.lesson_source_widget.clone(),
            config.lesson_target_widget.clone(),
            target,
        );

        if let Err(err) = process_channel.reconcile(&mut manager) {
            debug!(error = %err, "Skipped process channel reconciliation");
        }
        if let Err(err) = lesson_channel.reconcile(&mut manager) {
            debug!(error = %err, "Skipped lesson channel reconciliation");
        }

        let detector = ProcessDetector::new(
            &config.process_name,
            config.process_match_mode,
            config.check_interval(),
            lister,
        );
        let lessons = LessonTracker::new(config.lesson_triggers.clone(), config.debounce());

        info!(
            process = %config.process_name,
            mode = ?config.process_match_mode,
            lesson_channel = config.enable_lesson_channel,
            target = %paths.target_document().display(),
            "Watcher initialised"
        );

        Self {
            config,
            manager,
            detector,
            lessons,
            process_channel,
            lesson_channel,
            clock,
            base_mismatch_logged: false,
        }
    }

    /// Runs one tick. Never fails; failures are logged and reported.
    pub fn update(&mut self, ctx: &dyn HostContext) -> TickReport {
        self.check_base_directory(ctx.base_directory());

        let now = self.clock.now();
        let process_running = self.detector.detect(now);
        let mut report = TickReport {
            process_running,
            ..TickReport::default()
        };

        if self.config.enable_lesson_channel {
            self.lessons
                .check_lesson_change(ctx.current_lesson().unwrap_or(""), now);
            report.lesson_condition = self.lessons.condition_met();
            report.debounce_elapsed = self.lessons.debounce_elapsed(now);

            if report.debounce_elapsed {
                report.lesson_action = self.step_lesson(report.lesson_condition);
            }
        }

        report.process_action = self.step_process(process_running);
        report
    }

    /// The target path is fixed at construction; a host reporting another base
    /// directory is logged once and otherwise ignored.
    fn check_base_directory(&mut self, reported: &Path) {
        if self.base_mismatch_logged || reported == self.manager.paths().base_dir() {
            return;
        }
        warn!(
            reported = %reported.display(),
            configured = %self.manager.paths().base_dir().display(),
            "Host base directory differs from the configured one"
        );
        self.base_mismatch_logged = true;
    }

    fn step_lesson(&mut self, condition: bool) -> Option<Action> {
        let modified = self.manager.state().lesson_modified;
        if condition && !modified {
            let result = self.lesson_channel.modify_for_lesson(&mut self.manager);
            Some(Action::Modify(settle(result, "Lesson modification")))
        } else if !condition && modified {
            let result = self.lesson_channel.restore_for_lesson(&mut self.manager);
            Some(Action::Restore(settle(result, "Lesson restoration")))
        } else {
            None
        }
    }

    fn step_process(&mut self, running: bool) -> Option<Action> {
        let modified = self.manager.state().process_modified;
        if running && !modified {
            let result = self.process_channel.apply_modification(&mut self.manager);
            Some(Action::Modify(settle(result, "Process modification")))
        } else if !running && modified {
            let result = self.process_channel.restore(&mut self.manager);
            Some(Action::Restore(settle(result, "Process restoration")))
        } else {
            None
        }
    }

    /// Returns both channels to Idle regardless of conditions.
    pub fn restore_all(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let state = self.manager.state();
        if state.lesson_modified || state.lesson_backup_done {
            let result = self.lesson_channel.restore_for_lesson(&mut self.manager);
            report.lesson_action = Some(Action::Restore(settle(result, "Lesson restoration")));
        }
        if self.manager.state().process_modified || self.manager.has_backup_value() {
            let result = self.process_channel.restore(&mut self.manager);
            report.process_action = Some(Action::Restore(settle(result, "Process restoration")));
        }
        report
    }

    /// Deletes all persisted artifacts without touching the document.
    pub fn reset(&mut self) {
        self.manager.reset();
    }

    pub fn state(&self) -> &WatcherState {
        self.manager.state()
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub fn paths(&self) -> &StoragePaths {
        self.manager.paths()
    }

    pub fn current_lesson(&self) -> Option<&str> {
        self.lessons.current()
    }
}

fn settle(result: Result<ChannelOutcome>, action: &str) -> ActionStatus {
    match result {
        Ok(outcome) => {
            if outcome == ChannelOutcome::Applied {
                info!(action, "Completed");
            } else {
                debug!(action, ?outcome, "No change");
            }
            ActionStatus::Done(outcome)
        }
        Err(err) => {
            error!(action, error = %err, "Failed");
            ActionStatus::Failed(err.to_string())
        }
    }
}
