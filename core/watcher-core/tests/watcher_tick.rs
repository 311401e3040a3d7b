//! End-to-end tick tests for the watcher state machine.

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use fs_err as fs;
use tempfile::TempDir;
use watcher_core::{
    Action, ActionStatus, ChannelOutcome, Clock, ProcessLister, Result, StaticContext,
    StoragePaths, Watcher, WatcherConfig, WidgetDocument,
};

const LYRICS: &str = "lx-music-lyrics.ui";
const PROCESS: &str = "lx-music-desktop.exe";

struct FakeLister(Rc<RefCell<Vec<String>>>);

impl ProcessLister for FakeLister {
    fn running_process_names(&mut self) -> Result<Vec<String>> {
        Ok(self.0.borrow().clone())
    }
}

struct ManualClock(Rc<Cell<Instant>>);

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

struct Harness {
    _temp: TempDir,
    paths: StoragePaths,
    config: WatcherConfig,
    processes: Rc<RefCell<Vec<String>>>,
    clock: Rc<Cell<Instant>>,
    ctx: StaticContext,
    watcher: Watcher,
}

impl Harness {
    fn new(widgets: &str, config: WatcherConfig) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let base_dir = temp.path().join("host");
        let paths = StoragePaths::with_roots(temp.path().join("plugin"), base_dir.clone());
        let target = paths.target_document();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, format!(r#"{{"widgets": {widgets}, "grid": 4}}"#)).unwrap();

        let processes = Rc::new(RefCell::new(vec!["init".to_string()]));
        let clock = Rc::new(Cell::new(Instant::now()));
        let watcher = build(&config, &paths, &processes, &clock);

        Self {
            _temp: temp,
            paths,
            config,
            processes,
            clock,
            ctx: StaticContext {
                base_directory: base_dir,
                current_lesson: None,
            },
            watcher,
        }
    }

    /// Rebuilds the watcher from disk, as after a host restart.
    fn restart(&mut self) {
        self.watcher = build(&self.config, &self.paths, &self.processes, &self.clock);
    }

    fn set_running(&self, running: bool) {
        let mut names = vec!["init".to_string()];
        if running {
            names.push(PROCESS.to_string());
        }
        *self.processes.borrow_mut() = names;
    }

    fn set_lesson(&mut self, label: &str) {
        self.ctx.current_lesson = Some(label.to_string());
    }

    fn advance_ms(&self, ms: u64) {
        self.clock.set(self.clock.get() + Duration::from_millis(ms));
    }

    fn tick(&mut self) -> watcher_core::TickReport {
        self.watcher.update(&self.ctx)
    }

    fn widgets(&self) -> Vec<String> {
        WidgetDocument::load(&self.paths.target_document())
            .unwrap()
            .widgets()
            .unwrap()
    }

    fn target(&self) -> PathBuf {
        self.paths.target_document()
    }
}

fn build(
    config: &WatcherConfig,
    paths: &StoragePaths,
    processes: &Rc<RefCell<Vec<String>>>,
    clock: &Rc<Cell<Instant>>,
) -> Watcher {
    Watcher::with_capabilities(
        config.clone(),
        paths.clone(),
        Box::new(FakeLister(Rc::clone(processes))),
        Box::new(ManualClock(Rc::clone(clock))),
    )
}

fn process_only() -> WatcherConfig {
    WatcherConfig {
        check_interval_secs: 0.0,
        enable_lesson_channel: false,
        ..WatcherConfig::default()
    }
}

fn lesson_enabled() -> WatcherConfig {
    WatcherConfig {
        check_interval_secs: 0.0,
        ..WatcherConfig::default()
    }
}

fn applied_modify() -> Option<Action> {
    Some(Action::Modify(ActionStatus::Done(ChannelOutcome::Applied)))
}

fn applied_restore() -> Option<Action> {
    Some(Action::Restore(ActionStatus::Done(ChannelOutcome::Applied)))
}

#[test]
fn process_start_and_stop_toggle_terminal_slot() {
    let mut h = Harness::new(r#"["weather.ui", "clock.ui"]"#, process_only());

    assert_eq!(h.tick().process_action, None);

    h.set_running(true);
    let report = h.tick();
    assert!(report.process_running);
    assert_eq!(report.process_action, applied_modify());
    assert_eq!(h.widgets(), vec!["weather.ui", LYRICS]);
    assert!(h.watcher.state().process_modified);

    // Steady state: nothing to do.
    assert_eq!(h.tick().process_action, None);

    h.set_running(false);
    assert_eq!(h.tick().process_action, applied_restore());
    assert_eq!(h.widgets(), vec!["weather.ui", "clock.ui"]);
    assert!(!h.paths.original_value_file().exists());

    let text = fs::read_to_string(h.target()).unwrap();
    assert!(text.contains("\"grid\": 4"));
}

#[test]
fn process_poll_is_rate_limited() {
    let config = WatcherConfig {
        check_interval_secs: 3.0,
        enable_lesson_channel: false,
        ..WatcherConfig::default()
    };
    let mut h = Harness::new(r#"["clock.ui"]"#, config);

    h.set_running(true);
    h.tick();
    assert_eq!(h.widgets(), vec![LYRICS]);

    h.set_running(false);
    h.advance_ms(1_000);
    let report = h.tick();
    assert!(report.process_running);
    assert_eq!(report.process_action, None);

    h.advance_ms(2_000);
    assert_eq!(h.tick().process_action, applied_restore());
    assert_eq!(h.widgets(), vec!["clock.ui"]);
}

#[test]
fn failed_action_is_retried_next_tick() {
    let mut h = Harness::new(r#"["clock.ui"]"#, process_only());
    fs::write(h.target(), "{\"widgets\": [").unwrap();

    h.set_running(true);
    let report = h.tick();
    assert!(matches!(
        report.process_action,
        Some(Action::Modify(ActionStatus::Failed(_)))
    ));
    assert!(!h.watcher.state().process_modified);

    fs::write(h.target(), r#"{"widgets": ["clock.ui"]}"#).unwrap();
    assert_eq!(h.tick().process_action, applied_modify());
    assert_eq!(h.widgets(), vec![LYRICS]);
}

#[test]
fn empty_widget_list_never_modifies() {
    let mut h = Harness::new("[]", process_only());
    h.set_running(true);

    for _ in 0..3 {
        let report = h.tick();
        assert!(matches!(
            report.process_action,
            Some(Action::Modify(ActionStatus::Failed(_)))
        ));
    }
    assert!(h.widgets().is_empty());
    assert!(!h.watcher.state().backup_done);
}

#[test]
fn lesson_channel_waits_for_debounce() {
    let mut h = Harness::new(r#"["a", "example-1.ui", "b"]"#, lesson_enabled());

    h.set_lesson("Subject_1");
    let report = h.tick();
    assert!(report.lesson_condition);
    assert!(!report.debounce_elapsed);
    assert_eq!(report.lesson_action, None);

    h.advance_ms(4_000);
    assert_eq!(h.tick().lesson_action, None);

    h.advance_ms(500);
    assert_eq!(h.tick().lesson_action, applied_modify());
    assert_eq!(h.widgets(), vec!["a", "example-2.ui", "b"]);

    h.set_lesson("Break");
    h.advance_ms(1_000);
    assert_eq!(h.tick().lesson_action, None);
    h.advance_ms(4_500);
    assert_eq!(h.tick().lesson_action, applied_restore());
    assert_eq!(h.widgets(), vec!["a", "example-1.ui", "b"]);
    assert!(!h.paths.lesson_backup_file().exists());
}

#[test]
fn flapping_lesson_label_defers_until_last_change() {
    let mut h = Harness::new(r#"["example-1.ui", "clock.ui"]"#, lesson_enabled());

    h.set_lesson("Subject_1");
    h.tick();
    h.advance_ms(2_000);
    h.set_lesson("Math");
    h.tick();
    h.advance_ms(1_000);
    h.set_lesson("Subject_1");
    h.tick();

    // 4.5s after the first change, 2s after the last one.
    h.advance_ms(2_000);
    assert_eq!(h.tick().lesson_action, None);
    assert_eq!(h.widgets(), vec!["example-1.ui", "clock.ui"]);

    h.advance_ms(2_500);
    assert_eq!(h.tick().lesson_action, applied_modify());
    assert_eq!(h.widgets(), vec!["example-2.ui", "clock.ui"]);
}

#[test]
fn lesson_guard_skips_when_target_present() {
    let mut h = Harness::new(r#"["example-1.ui", "example-2.ui"]"#, lesson_enabled());
    h.set_lesson("Subject_2");
    h.tick();
    h.advance_ms(5_000);

    let report = h.tick();
    assert!(matches!(
        report.lesson_action,
        Some(Action::Modify(ActionStatus::Done(ChannelOutcome::Skipped(_))))
    ));
    assert_eq!(h.widgets(), vec!["example-1.ui", "example-2.ui"]);
    assert!(!h.watcher.state().lesson_modified);
}

#[test]
fn channels_do_not_clobber_each_other() {
    let mut h = Harness::new(r#"["example-1.ui", "clock.ui"]"#, lesson_enabled());
    h.set_lesson("Subject_3");
    h.tick();
    h.advance_ms(5_000);
    h.set_running(true);

    let report = h.tick();
    assert_eq!(report.lesson_action, applied_modify());
    assert_eq!(report.process_action, applied_modify());
    assert_eq!(h.widgets(), vec!["example-2.ui", LYRICS]);

    h.set_running(false);
    let report = h.tick();
    assert_eq!(report.lesson_action, None);
    assert_eq!(report.process_action, applied_restore());
    assert_eq!(h.widgets(), vec!["example-2.ui", "clock.ui"]);
    assert!(h.watcher.state().lesson_modified);
}

#[test]
fn disabled_lesson_channel_ignores_labels() {
    let mut h = Harness::new(r#"["example-1.ui"]"#, process_only());
    h.set_lesson("Subject_1");
    h.tick();
    h.advance_ms(10_000);

    let report = h.tick();
    assert!(!report.lesson_condition);
    assert_eq!(report.lesson_action, None);
    assert_eq!(h.widgets(), vec!["example-1.ui"]);
}

#[test]
fn restart_restores_from_persisted_backup() {
    let mut h = Harness::new(r#"["a", "clock.ui"]"#, process_only());
    h.set_running(true);
    h.tick();
    assert_eq!(h.widgets(), vec!["a", LYRICS]);

    h.set_running(false);
    h.restart();
    assert!(h.watcher.state().process_modified);
    assert_eq!(h.watcher.state().original_value.as_deref(), Some("clock.ui"));

    assert_eq!(h.tick().process_action, applied_restore());
    assert_eq!(h.widgets(), vec!["a", "clock.ui"]);
}

#[test]
fn restart_recovers_unrecorded_modification() {
    let mut h = Harness::new(r#"["a", "clock.ui"]"#, process_only());
    // Crash after writing the document but before saving `modified`.
    fs::create_dir_all(h.paths.config_dir()).unwrap();
    fs::write(h.paths.original_value_file(), "clock.ui").unwrap();
    fs::write(h.paths.state_file(), r#"{"backup_done": true}"#).unwrap();
    fs::write(h.target(), format!(r#"{{"widgets": ["a", "{LYRICS}"]}}"#)).unwrap();

    h.restart();
    assert!(h.watcher.state().process_modified);

    assert_eq!(h.tick().process_action, applied_restore());
    assert_eq!(h.widgets(), vec!["a", "clock.ui"]);
}

#[test]
fn unreadable_backup_is_never_overwritten() {
    let widgets = format!(r#"["a", "{LYRICS}"]"#);
    let mut h = Harness::new(&widgets, process_only());
    fs::write(h.paths.state_file(), r#"{"modified": true, "backup_done": true}"#).unwrap();
    let gbk: &[u8] = b"\xca\xb1\xd6\xd3.ui";
    fs::write(h.paths.original_value_file(), gbk).unwrap();

    h.restart();
    assert!(h.watcher.state().process_modified);
    assert!(h.watcher.state().backup_done);

    h.set_running(true);
    assert_eq!(h.tick().process_action, None);

    h.set_running(false);
    let report = h.tick();
    assert!(matches!(
        report.process_action,
        Some(Action::Restore(ActionStatus::Failed(_)))
    ));
    assert_eq!(fs::read(h.paths.original_value_file()).unwrap(), gbk);
    assert_eq!(h.widgets(), vec!["a", LYRICS]);
}

#[test]
fn restart_recovers_unrecorded_lesson_swap() {
    let mut h = Harness::new(r#"["a", "example-2.ui", "b"]"#, lesson_enabled());
    fs::write(h.paths.state_file(), r#"{"lesson_backup_done": true}"#).unwrap();
    fs::write(
        h.paths.lesson_backup_file(),
        r#"{"widgets": ["a", "example-1.ui", "b"]}"#,
    )
    .unwrap();

    h.restart();
    assert!(h.watcher.state().lesson_modified);

    h.set_lesson("Math");
    for _ in 0..10 {
        h.tick();
        h.advance_ms(1_000);
    }
    assert_eq!(h.widgets(), vec!["a", "example-1.ui", "b"]);
    assert!(!h.watcher.state().lesson_backup_done);
    assert!(!h.paths.lesson_backup_file().exists());
}

#[test]
fn corrupt_state_resets_and_keeps_working() {
    let mut h = Harness::new(r#"["a", "clock.ui"]"#, process_only());
    fs::write(h.paths.state_file(), "\u{0}\u{0}garbage").unwrap();
    fs::write(h.paths.original_value_file(), "stale.ui").unwrap();

    h.restart();
    assert!(!h.watcher.state().process_modified);
    assert!(!h.watcher.state().backup_done);
    assert!(!h.paths.original_value_file().exists());

    h.set_running(true);
    assert_eq!(h.tick().process_action, applied_modify());
    assert_eq!(
        fs::read_to_string(h.paths.original_value_file()).unwrap(),
        "clock.ui"
    );
}

#[test]
fn legacy_state_is_migrated_before_load() {
    let widgets = format!(r#"["a", "{LYRICS}"]"#);
    let mut h = Harness::new(&widgets, process_only());
    fs::write(
        h.paths.plugin_dir().join("plugin_state.json"),
        r#"{"modified": true, "backup_done": true}"#,
    )
    .unwrap();
    fs::write(h.paths.plugin_dir().join("original_value.txt"), "clock.ui").unwrap();

    h.restart();
    assert!(h.watcher.state().process_modified);
    assert!(h.paths.state_file().exists());

    assert_eq!(h.tick().process_action, applied_restore());
    assert_eq!(h.widgets(), vec!["a", "clock.ui"]);
}

#[test]
fn restore_all_returns_both_channels_to_idle() {
    let mut h = Harness::new(r#"["example-1.ui", "clock.ui"]"#, lesson_enabled());
    h.set_lesson("Subject_1");
    h.tick();
    h.advance_ms(5_000);
    h.set_running(true);
    h.tick();
    assert_eq!(h.widgets(), vec!["example-2.ui", LYRICS]);

    let report = h.watcher.restore_all();
    assert_eq!(report.lesson_action, applied_restore());
    assert_eq!(report.process_action, applied_restore());
    assert_eq!(h.widgets(), vec!["example-1.ui", "clock.ui"]);
    assert!(!h.watcher.state().process_modified);
    assert!(!h.watcher.state().lesson_modified);
}
