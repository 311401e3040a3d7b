//! Logging setup: daily-rolled file in `<plugin_dir>/log/` plus stderr.
//!
//! `WIDGET_WATCHER_DEBUG=1` forces debug level; otherwise `WIDGET_WATCHER_LOG`
//! is read as an `EnvFilter` directive, defaulting to `info`.

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "plugin.log";

/// Installs the global subscriber. Keep the guard alive for the whole process
/// or buffered file output is lost on exit.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = build_filter();

    if let Err(err) = fs_err::create_dir_all(log_dir) {
        eprintln!("widget-watcher: cannot create log dir, logging to stderr only: {err}");
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();

    Some(guard)
}

fn build_filter() -> EnvFilter {
    let debug_enabled = env::var("WIDGET_WATCHER_DEBUG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("WIDGET_WATCHER_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    }
}
