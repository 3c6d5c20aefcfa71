// src/detect/detector.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::DetectionSettings;
use crate::detect::state::{DetectionState, Observation, Resolution, Signal};
use crate::process::{Family, ProcessQuery};
use crate::records::{RecordStore, RunningRecord};
use crate::window::{WindowSource, list_on_screen};

/// Async driver for [`DetectionState`]: sleeps one poll interval, samples
/// the OS, feeds the state machine, repeats.
pub struct Detector {
    settings: DetectionSettings,
    records: Arc<RecordStore>,
    processes: Arc<dyn ProcessQuery>,
    windows: Arc<dyn WindowSource>,
    family: Family,
}

impl Detector {
    pub fn new(
        settings: DetectionSettings,
        records: Arc<RecordStore>,
        processes: Arc<dyn ProcessQuery>,
        windows: Arc<dyn WindowSource>,
        family: Family,
    ) -> Self {
        Self {
            settings,
            records,
            processes,
            windows,
            family,
        }
    }

    /// Poll until `executable_name` (launched at `started_at`) is ready,
    /// has exited, or the attempt budget runs out.
    ///
    /// When found, the owning process is brought to the foreground.
    pub async fn wait_until_ready(
        &self,
        executable_name: &str,
        started_at: DateTime<Utc>,
    ) -> Resolution {
        let mut state = DetectionState::new(started_at, &self.settings);

        loop {
            tokio::time::sleep(self.settings.poll_interval).await;

            let obs = self.sample(executable_name, started_at).await;
            let outcome = state.observe(&obs);
            debug!(
                program = executable_name,
                attempt = state.attempts(),
                phase = ?state.phase(),
                ?obs,
                "readiness tick"
            );

            match outcome {
                None => continue,
                Some(Resolution::Found { via, pid }) => {
                    info!(program = executable_name, pid, ?via, attempt = state.attempts(), "program is ready");
                    self.raise(pid).await;
                    return Resolution::Found { via, pid };
                }
                Some(Resolution::ProcessExited) => {
                    info!(
                        program = executable_name,
                        attempt = state.attempts(),
                        "no related process left; stopping readiness detection"
                    );
                    return Resolution::ProcessExited;
                }
                Some(Resolution::TimedOut) => {
                    info!(
                        program = executable_name,
                        attempts = state.attempts(),
                        "no window appeared; leaving program running in the background"
                    );
                    return Resolution::TimedOut;
                }
            }
        }
    }

    /// Sample the three signals in priority order, stopping at the first
    /// one that settles the tick.
    async fn sample(&self, executable_name: &str, started_at: DateTime<Utc>) -> Observation {
        let records = self.live_records().await;
        if let Some(record) = records
            .iter()
            .find(|r| r.matches_executable(executable_name) && r.started_since(started_at))
        {
            return Observation {
                record_pid: Some(record.process_id),
                any_running_records: true,
                ..Observation::default()
            };
        }

        let any_running_records = !records.is_empty();
        let family_alive =
            any_running_records || self.family.any_alive(self.processes.as_ref()).await;
        if !family_alive {
            return Observation {
                any_running_records,
                ..Observation::default()
            };
        }

        Observation {
            record_pid: None,
            any_running_records,
            family_alive,
            window_pid: self.substantial_window_pid().await,
        }
    }

    /// Owner pid of the first family window that is big and opaque.
    pub async fn substantial_window_pid(&self) -> Option<u32> {
        list_on_screen(&self.windows)
            .await
            .into_iter()
            .find(|w| {
                self.family.owns_window(&w.owner_name)
                    && w.is_substantial(self.settings.min_window_width, self.settings.min_window_height)
            })
            .map(|w| w.pid)
    }

    /// Bring an already-running instance of `executable_name` forward.
    ///
    /// Prefers the program's own running-record regardless of age, then any
    /// substantial family window. Returns whether something was raised.
    pub async fn focus_existing(&self, executable_name: &str) -> bool {
        let record_pid = self
            .live_records()
            .await
            .into_iter()
            .find(|r| r.matches_executable(executable_name))
            .map(|r| r.process_id);
        let pid = match record_pid {
            Some(pid) => Some(pid),
            None => self.substantial_window_pid().await,
        };

        match pid {
            Some(pid) => {
                self.raise(pid).await;
                true
            }
            None => {
                debug!(program = executable_name, "no window to focus for running instance");
                false
            }
        }
    }

    /// Record scanning reads, parses and deletes files, so it runs off the
    /// async workers.
    async fn live_records(&self) -> Vec<RunningRecord> {
        let records = Arc::clone(&self.records);
        match tokio::task::spawn_blocking(move || records.live_records()).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "running-record scan failed");
                Vec::new()
            }
        }
    }

    async fn raise(&self, pid: u32) {
        if let Err(e) = self.windows.activate(pid).await {
            warn!(pid, error = %e, "failed to bring program to the foreground");
        }
    }
}

