// src/records.rs

//! Running-records: small JSON files that a guest program's runtime writes
//! into the workspace's running directory to announce itself.
//!
//! This crate never creates records. It reads them, trusts the ones whose
//! process is still alive, and deletes everything else it finds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::process::ProcessQuery;

/// One announced, running guest program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningRecord {
    pub executable_name: String,
    pub full_path: String,
    pub process_id: u32,
    pub started_at: DateTime<Utc>,
}

impl RunningRecord {
    pub fn matches_executable(&self, name: &str) -> bool {
        self.executable_name.to_lowercase() == name.to_lowercase()
    }

    /// Whether this record was written by a process started at or after
    /// `since`.
    ///
    /// Compared at whole-second precision: runtimes commonly stamp records
    /// without fractional seconds, and such a record written in the launch
    /// second must still count.
    pub fn started_since(&self, since: DateTime<Utc>) -> bool {
        self.started_at >= since.trunc_subsecs(0)
    }
}

/// Outcome of one sweep over the running directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub kept: usize,
    pub removed: usize,
}

/// Reader/validator for one workspace's running directory.
pub struct RecordStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    processes: Arc<dyn ProcessQuery>,
}

impl RecordStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        processes: Arc<dyn ProcessQuery>,
    ) -> Self {
        Self {
            dir: dir.into(),
            fs,
            processes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All records whose process is alive. Unparseable and stale files are
    /// deleted as a side effect.
    pub fn live_records(&self) -> Vec<RunningRecord> {
        self.scan().0
    }

    /// A live record for `executable_name` started at or after `since`.
    ///
    /// Records left behind by an earlier run of the same binary are older
    /// than `since` and never match.
    pub fn find_fresh(&self, executable_name: &str, since: DateTime<Utc>) -> Option<RunningRecord> {
        self.live_records()
            .into_iter()
            .find(|r| r.matches_executable(executable_name) && r.started_since(since))
    }

    pub fn sweep(&self) -> SweepReport {
        let (kept, removed) = self.scan();
        let report = SweepReport {
            kept: kept.len(),
            removed,
        };
        debug!(dir = ?self.dir, kept = report.kept, removed = report.removed, "record sweep");
        report
    }

    fn scan(&self) -> (Vec<RunningRecord>, usize) {
        let entries = match self.fs.read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = ?self.dir, error = %e, "cannot list running directory");
                return (Vec::new(), 0);
            }
        };

        let mut live = Vec::new();
        let mut removed = 0;
        for path in entries {
            if path.extension().and_then(|e| e.to_str()) != Some("json") || !self.fs.is_file(&path)
            {
                continue;
            }
            match self.read_record(&path) {
                Some(record) if self.processes.is_alive(record.process_id) => live.push(record),
                Some(record) => {
                    debug!(
                        path = ?path,
                        pid = record.process_id,
                        "removing record of exited process"
                    );
                    removed += self.remove(&path);
                }
                None => removed += self.remove(&path),
            }
        }
        (live, removed)
    }

    fn read_record(&self, path: &Path) -> Option<RunningRecord> {
        let text = match self.fs.read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = ?path, error = %e, "unreadable running-record");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = ?path, error = %e, "malformed running-record");
                None
            }
        }
    }

    fn remove(&self, path: &Path) -> usize {
        match self.fs.remove_file(path) {
            Ok(()) => 1,
            Err(e) => {
                warn!(path = ?path, error = %e, "failed to remove stale running-record");
                0
            }
        }
    }
}

/// Sweep `store` every `interval` until the returned handle is aborted.
pub fn spawn_record_sweeper(store: Arc<RecordStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let store = Arc::clone(&store);
            if let Err(e) = tokio::task::spawn_blocking(move || store.sweep()).await {
                warn!(error = %e, "record sweep failed");
            }
        }
    })
}
