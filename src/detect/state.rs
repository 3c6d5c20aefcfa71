// src/detect/state.rs

//! Pure readiness state machine.
//!
//! `AwaitingSignal -> Stable -> Resolved(found)` on the window path,
//! `AwaitingSignal -> Resolved(found)` on a record hit, and
//! `AwaitingSignal -> Resolved(exited)` when nothing related is left
//! running. Running out of attempts resolves as `TimedOut`, which callers
//! treat as "still running in the background", not as a failure.

use chrono::{DateTime, Utc};

use crate::config::DetectionSettings;

/// Which signal established readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Record,
    Window,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Record => "running-record",
            Signal::Window => "window",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found { via: Signal, pid: u32 },
    ProcessExited,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingSignal,
    /// A window has been seen on `hits` consecutive ticks.
    Stable { hits: u32 },
    Resolved(Resolution),
}

/// What one tick saw.
///
/// The sampler may stop early once a higher-priority signal fires, so
/// lower-priority fields are only meaningful when the ones above them are
/// negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Observation {
    /// Pid from a running-record for this program dated at or after the
    /// launch.
    pub record_pid: Option<u32>,
    /// Any live running-record at all in the workspace.
    pub any_running_records: bool,
    /// Any process of the managed family alive on the system.
    pub family_alive: bool,
    /// Owner pid of a substantial family window.
    pub window_pid: Option<u32>,
}

/// Per-launch detection state. Dropped when detection resolves.
#[derive(Debug, Clone)]
pub struct DetectionState {
    started_at: DateTime<Utc>,
    consecutive_hits: u32,
    attempts: u32,
    stability_threshold: u32,
    max_attempts: u32,
    resolved: Option<Resolution>,
}

impl DetectionState {
    pub fn new(started_at: DateTime<Utc>, settings: &DetectionSettings) -> Self {
        Self {
            started_at,
            consecutive_hits: 0,
            attempts: 0,
            stability_threshold: settings.stability_threshold.max(1),
            max_attempts: settings.max_attempts.max(1),
            resolved: None,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn consecutive_hits(&self) -> u32 {
        self.consecutive_hits
    }

    pub fn phase(&self) -> Phase {
        match self.resolved {
            Some(resolution) => Phase::Resolved(resolution),
            None if self.consecutive_hits > 0 => Phase::Stable {
                hits: self.consecutive_hits,
            },
            None => Phase::AwaitingSignal,
        }
    }

    /// Apply one tick. Returns the resolution once there is one; further
    /// calls keep returning it without counting attempts.
    pub fn observe(&mut self, obs: &Observation) -> Option<Resolution> {
        if self.resolved.is_some() {
            return self.resolved;
        }
        self.attempts += 1;

        let mut resolution = if let Some(pid) = obs.record_pid {
            Some(Resolution::Found {
                via: Signal::Record,
                pid,
            })
        } else if !obs.any_running_records && !obs.family_alive {
            Some(Resolution::ProcessExited)
        } else if let Some(pid) = obs.window_pid {
            self.consecutive_hits += 1;
            (self.consecutive_hits >= self.stability_threshold).then_some(Resolution::Found {
                via: Signal::Window,
                pid,
            })
        } else {
            self.consecutive_hits = 0;
            None
        };

        if resolution.is_none() && self.attempts >= self.max_attempts {
            resolution = Some(Resolution::TimedOut);
        }
        self.resolved = resolution;
        resolution
    }
}
