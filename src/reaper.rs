// src/reaper.rs

//! Best-effort shutdown cleanup for everything the compatibility layer
//! spawned.
//!
//! Two phases, because no single way of identifying the family catches
//! all of it:
//! 1. window owners: any process showing a window whose owner name belongs
//!    to the family is killed by pid, whatever its command line says;
//! 2. command lines: runtime helpers matched by name, plus worker
//!    processes matched by the prefix path they were started from.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::process::{Family, ProcessQuery, worker_pattern};
use crate::window::{WindowSource, list_on_screen};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Processes killed because they owned a family window.
    pub window_owners: usize,
    /// Processes killed because their command line matched.
    pub pattern_matches: usize,
}

impl ReapReport {
    pub fn total(&self) -> usize {
        self.window_owners + self.pattern_matches
    }
}

pub struct Reaper {
    processes: Arc<dyn ProcessQuery>,
    windows: Arc<dyn WindowSource>,
    family: Family,
    worker_patterns: Vec<String>,
}

impl Reaper {
    pub fn new(
        processes: Arc<dyn ProcessQuery>,
        windows: Arc<dyn WindowSource>,
        family: Family,
    ) -> Self {
        Self {
            processes,
            windows,
            family,
            worker_patterns: Vec::new(),
        }
    }

    /// Also reap workers started from `<prefix>/<dir>/` for each dir.
    pub fn with_worker_dirs<S: AsRef<str>>(mut self, prefix: &Path, dirs: &[S]) -> Self {
        self.worker_patterns
            .extend(dirs.iter().map(|d| worker_pattern(prefix, d.as_ref())));
        self
    }

    /// Command-line patterns used by phase two.
    pub fn patterns(&self) -> Vec<String> {
        std::iter::once(self.family.command_pattern().to_string())
            .chain(self.worker_patterns.iter().cloned())
            .collect()
    }

    pub async fn reap(&self) -> ReapReport {
        let window_owners = self.kill_window_owners().await;

        let mut pattern_matches = 0;
        for pattern in self.patterns() {
            let killed = self.processes.kill_matching(&pattern).await;
            debug!(%pattern, killed, "reaped by command line");
            pattern_matches += killed;
        }

        let report = ReapReport {
            window_owners,
            pattern_matches,
        };
        info!(
            window_owners = report.window_owners,
            pattern_matches = report.pattern_matches,
            "reaper finished"
        );
        report
    }

    async fn kill_window_owners(&self) -> usize {
        let own = std::process::id();
        let owners: BTreeSet<u32> = list_on_screen(&self.windows)
            .await
            .into_iter()
            .filter(|w| w.pid != own && self.family.owns_window(&w.owner_name))
            .map(|w| w.pid)
            .collect();

        owners
            .into_iter()
            .filter(|&pid| {
                let killed = self.processes.kill(pid);
                debug!(pid, killed, "reaped window owner");
                killed
            })
            .count()
    }
}
