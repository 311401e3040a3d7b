//! widget-watcher: standalone host for the widget watcher.
//!
//! ## Subcommands
//!
//! - `run`: Tick loop; drives `Watcher::update` at a fixed interval
//! - `status`: Prints persisted state and the target's terminal widget as JSON
//! - `restore`: Forces both channels back to the original widgets
//! - `reset`: Deletes persisted state and backups without touching the target

mod context;
mod logging;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use watcher_core::{
    Action, ActionStatus, StateManager, StoragePaths, Watcher, WatcherConfig, WatcherState,
    WidgetDocument,
};

use crate::context::CliContext;

#[derive(Parser)]
#[command(name = "widget-watcher")]
#[command(about = "Swaps widget entries while a process or lesson is active")]
#[command(version)]
struct Cli {
    /// Directory for watcher state, backups and logs
    #[arg(long, global = true, value_name = "DIR")]
    plugin_dir: Option<PathBuf>,

    /// Host base directory containing config/widget.json
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Watcher configuration file (defaults to <plugin-dir>/config/watcher.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tick loop
    Run {
        /// Current lesson label
        #[arg(long, conflicts_with = "lesson_file")]
        lesson: Option<String>,

        /// File holding the current lesson label, re-read every tick
        #[arg(long, value_name = "PATH")]
        lesson_file: Option<PathBuf>,

        /// Milliseconds between ticks
        #[arg(long, default_value_t = 1000)]
        tick_ms: u64,

        /// Stop after this many ticks (runs until SIGINT/SIGTERM when omitted)
        #[arg(long)]
        ticks: Option<u64>,

        /// Restore original widgets when the loop ends, including on SIGINT/SIGTERM
        #[arg(long)]
        restore_on_exit: bool,
    },

    /// Print persisted state as JSON
    Status,

    /// Restore original widgets now
    Restore,

    /// Delete persisted state and backups
    Reset,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    plugin_dir: &'a Path,
    target: PathBuf,
    process_modified: bool,
    backup_done: bool,
    original_value: Option<&'a str>,
    lesson_modified: bool,
    lesson_backup_done: bool,
    lesson_original_value: Option<&'a [String]>,
    terminal_widget: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let paths = match cli.plugin_dir.clone() {
        Some(dir) => StoragePaths::with_roots(dir, cli.base_dir.clone()),
        None => StoragePaths::default_for(cli.base_dir.clone()),
    };
    let logging_guard = logging::init(&paths.log_dir());

    let config = load_config(&cli, &paths);

    let code = match cli.command {
        Commands::Run {
            lesson,
            lesson_file,
            tick_ms,
            ticks,
            restore_on_exit,
        } => {
            let mut watcher = Watcher::new(config, paths);
            let mut ctx = CliContext::new(cli.base_dir, lesson, lesson_file);
            let shutdown = register_shutdown();
            let ran = run_loop(
                &mut watcher,
                &mut ctx,
                Duration::from_millis(tick_ms),
                ticks,
                &shutdown,
            );
            tracing::info!(ticks = ran, "Tick loop stopped");
            if restore_on_exit {
                restore(&mut watcher)
            } else {
                0
            }
        }
        Commands::Status => print_status(&StateManager::load(paths)),
        Commands::Restore => restore(&mut Watcher::new(config, paths)),
        Commands::Reset => {
            let mut watcher = Watcher::new(config, paths);
            watcher.reset();
            tracing::info!("Watcher state reset");
            0
        }
    };

    // process::exit skips destructors; flush the file writer first.
    drop(logging_guard);
    std::process::exit(code);
}

fn load_config(cli: &Cli, paths: &StoragePaths) -> WatcherConfig {
    let path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    match WatcherConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "Using default configuration");
            WatcherConfig::default()
        }
    }
}

/// Sets the returned flag on SIGINT or SIGTERM so the tick loop can end
/// cleanly. Registration failures are logged; the loop then runs until killed.
fn register_shutdown() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&flag)) {
            tracing::warn!(error = %err, signal, "Failed to register signal handler");
        }
    }
    flag
}

/// Ticks until `ticks` is reached or `shutdown` is set. Returns the number of
/// ticks run.
fn run_loop(
    watcher: &mut Watcher,
    ctx: &mut CliContext,
    tick: Duration,
    ticks: Option<u64>,
    shutdown: &AtomicBool,
) -> u64 {
    let mut count: u64 = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) || ticks.is_some_and(|limit| count >= limit) {
            break;
        }
        ctx.refresh();
        let report = watcher.update(&*ctx);
        tracing::trace!(?report, "Tick");
        count += 1;
        thread::sleep(tick);
    }
    count
}

fn restore(watcher: &mut Watcher) -> i32 {
    let report = watcher.restore_all();
    let failed = [report.lesson_action, report.process_action]
        .into_iter()
        .flatten()
        .any(|action| matches!(action, Action::Restore(ActionStatus::Failed(_))));
    if failed {
        1
    } else {
        0
    }
}

/// Reads persisted state without migrating, reconciling, or scanning processes.
fn print_status(manager: &StateManager) -> i32 {
    let state: &WatcherState = manager.state();
    let target = manager.paths().target_document();
    let terminal_widget = WidgetDocument::load(&target)
        .and_then(|doc| doc.terminal_widget())
        .map_err(|err| tracing::debug!(error = %err, "Target document unreadable"))
        .ok();

    let report = StatusReport {
        plugin_dir: manager.paths().plugin_dir(),
        target,
        process_modified: state.process_modified,
        backup_done: state.backup_done,
        original_value: state.original_value.as_deref(),
        lesson_modified: state.lesson_modified,
        lesson_backup_done: state.lesson_backup_done,
        lesson_original_value: state.lesson_original_value.as_deref(),
        terminal_widget,
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize status");
            1
        }
    }
}
