// src/process/mod.rs

//! OS process queries: command-line search, liveness probes and forced
//! termination.
//!
//! Everything above this module talks to a [`ProcessQuery`] so the
//! registry, detector and reaper can be driven by a scripted fake in
//! tests. [`SystemProcesses`] is the production implementation built on
//! `pgrep -f` and `kill(2)`.

pub mod family;

use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{debug, warn};

pub use family::{Family, worker_pattern};

/// Boxed, sendable future used at the async trait seams of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstracting how processes are found, probed and killed.
pub trait ProcessQuery: Send + Sync {
    /// PIDs of every process whose full command line matches `pattern`
    /// (an extended regular expression, as understood by `pgrep -f`).
    fn find_matching<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Vec<u32>>;

    /// Signal-0 probe: does `pid` still name a live process?
    fn is_alive(&self, pid: u32) -> bool;

    /// Send SIGKILL to `pid`. Returns whether the signal was delivered.
    fn kill(&self, pid: u32) -> bool;

    /// Kill every process matching `pattern`, except ourselves.
    ///
    /// Returns the number of processes signalled.
    fn kill_matching<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, usize> {
        Box::pin(async move {
            let own = std::process::id();
            let mut killed = 0;
            for pid in self.find_matching(pattern).await {
                if pid != own && self.kill(pid) {
                    killed += 1;
                }
            }
            killed
        })
    }
}

/// Production implementation backed by `pgrep` and `libc::kill`.
#[derive(Debug, Clone, Default)]
pub struct SystemProcesses;

impl SystemProcesses {
    async fn pgrep(pattern: &str) -> Result<Vec<u32>> {
        let output = Command::new("pgrep")
            .arg("-f")
            .arg(pattern)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("running pgrep -f {pattern:?}"))?;

        // pgrep exits with 1 when nothing matched; anything else above 1 is
        // a real failure (bad pattern, etc.).
        match output.status.code() {
            Some(0) | Some(1) => {}
            code => anyhow::bail!(
                "pgrep -f {pattern:?} failed with {code:?}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .collect())
    }
}

impl ProcessQuery for SystemProcesses {
    fn find_matching<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, Vec<u32>> {
        Box::pin(async move {
            match Self::pgrep(pattern).await {
                Ok(pids) => {
                    debug!(pattern, count = pids.len(), "process search finished");
                    pids
                }
                Err(e) => {
                    warn!(pattern, error = %e, "process search failed; treating as no match");
                    Vec::new()
                }
            }
        })
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Some(pid) = to_pid(pid) else {
            return false;
        };
        // SAFETY: signal 0 performs only the existence/permission check.
        if unsafe { libc::kill(pid, 0) } == 0 {
            return true;
        }
        // EPERM: the process exists but belongs to someone else.
        std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
    }

    fn kill(&self, pid: u32) -> bool {
        let Some(raw) = to_pid(pid) else {
            return false;
        };
        // SAFETY: plain kill(2) on a single positive pid.
        let delivered = unsafe { libc::kill(raw, libc::SIGKILL) } == 0;
        if !delivered {
            debug!(
                pid,
                error = %std::io::Error::last_os_error(),
                "SIGKILL not delivered"
            );
        }
        delivered
    }
}

/// Reject pids that would address a process group or overflow `pid_t`.
fn to_pid(pid: u32) -> Option<libc::pid_t> {
    match libc::pid_t::try_from(pid) {
        Ok(p) if p > 0 => Some(p),
        _ => None,
    }
}
