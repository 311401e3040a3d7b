//! Process presence detection.
//!
//! Scanning the process table is comparatively expensive, so results are
//! cached for `check_interval` and host ticks inside that window reuse the
//! cached answer.

use std::time::{Duration, Instant};

use sysinfo::{ProcessRefreshKind, System};
use tracing::{debug, error};

use crate::config::ProcessMatchMode;
use crate::error::{Result, WatcherError};

/// Capability: list the names of currently running processes.
pub trait ProcessLister {
    fn running_process_names(&mut self) -> Result<Vec<String>>;
}

/// Production lister backed by `sysinfo`.
pub struct SysinfoProcessLister {
    sys: System,
}

impl SysinfoProcessLister {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for SysinfoProcessLister {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLister for SysinfoProcessLister {
    fn running_process_names(&mut self) -> Result<Vec<String>> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(WatcherError::ProcessEnumeration(
                "process listing is not supported on this platform".to_string(),
            ));
        }
        // Names only; skip cpu/memory/disk refresh.
        self.sys
            .refresh_processes_specifics(ProcessRefreshKind::new());
        Ok(self
            .sys
            .processes()
            .values()
            .map(|process| process.name().to_string())
            .collect())
    }
}

pub struct ProcessDetector {
    /// Lowercased once; matching is case-insensitive.
    target: String,
    mode: ProcessMatchMode,
    interval: Duration,
    last_check: Option<Instant>,
    cached_running: bool,
    lister: Box<dyn ProcessLister>,
}

impl ProcessDetector {
    pub fn new(
        process_name: &str,
        mode: ProcessMatchMode,
        interval: Duration,
        lister: Box<dyn ProcessLister>,
    ) -> Self {
        Self {
            target: process_name.to_lowercase(),
            mode,
            interval,
            last_check: None,
            cached_running: false,
            lister,
        }
    }

    /// Whether the target process is running as of `now`.
    ///
    /// Enumeration failures read as "not running" and leave the cache alone so
    /// the next tick rescans.
    pub fn detect(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_check {
            if now.saturating_duration_since(last) < self.interval {
                return self.cached_running;
            }
        }

        let names = match self.lister.running_process_names() {
            Ok(names) => names,
            Err(err) => {
                error!(error = %err, "Process detection failed");
                return false;
            }
        };

        let running = names
            .iter()
            .any(|name| self.mode.matches(name, &self.target));

        if running != self.cached_running {
            debug!(process = %self.target, running, "Process presence changed");
        }
        self.last_check = Some(now);
        self.cached_running = running;
        running
    }

    pub fn cached_running(&self) -> bool {
        self.cached_running
    }
}
