// src/registry/mod.rs

//! Per-workspace launch registry: the duplicate-launch guard.
//!
//! One [`LaunchRegistry`] exists per workspace. An identity is registered
//! before its process is spawned and unregistered once the launch resolves.
//! The lock only ever covers map operations; liveness probes and process
//! searches happen outside it, and any decision based on them is re-checked
//! under the lock before it mutates the map.

mod guard;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info};

use crate::process::{Family, ProcessQuery};
use crate::types::ProgramIdentity;

pub use guard::RegistrationGuard;

/// Liveness state of one registered program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    /// `None` while the launch is in flight (or when the spawned process is
    /// a short-lived wrapper that says nothing about the guest's liveness).
    pub pid: Option<u32>,
    pub registered_at: Instant,
}

pub struct LaunchRegistry {
    workspace: String,
    entries: Mutex<HashMap<ProgramIdentity, RegistryEntry>>,
    processes: Arc<dyn ProcessQuery>,
    family: Family,
}

impl LaunchRegistry {
    pub fn new(workspace: impl Into<String>, processes: Arc<dyn ProcessQuery>, family: Family) -> Self {
        Self {
            workspace: workspace.into(),
            entries: Mutex::new(HashMap::new()),
            processes,
            family,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProgramIdentity, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claim `identity`. Returns `false` if it is already held.
    pub fn try_register(&self, identity: &ProgramIdentity) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(identity) {
            debug!(workspace = %self.workspace, %identity, "duplicate launch rejected");
            return false;
        }
        entries.insert(
            identity.clone(),
            RegistryEntry {
                pid: None,
                registered_at: Instant::now(),
            },
        );
        debug!(workspace = %self.workspace, %identity, "launch registered");
        true
    }

    /// Like [`try_register`](Self::try_register), but returns a guard that
    /// unregisters on drop.
    pub fn try_acquire(self: &Arc<Self>, identity: &ProgramIdentity) -> Option<RegistrationGuard> {
        self.try_register(identity)
            .then(|| RegistrationGuard::new(Arc::clone(self), identity.clone()))
    }

    /// Record the pid of the process that embodies `identity`.
    pub fn attach_pid(&self, identity: &ProgramIdentity, pid: u32) {
        if let Some(entry) = self.lock().get_mut(identity) {
            entry.pid = Some(pid);
        }
    }

    /// Remove `identity`. Safe to call when it is already gone.
    pub fn unregister(&self, identity: &ProgramIdentity) -> bool {
        let removed = self.lock().remove(identity).is_some();
        if removed {
            debug!(workspace = %self.workspace, %identity, "launch unregistered");
        }
        removed
    }

    pub fn entry(&self, identity: &ProgramIdentity) -> Option<RegistryEntry> {
        self.lock().get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether `identity` is held by something still running.
    ///
    /// Entries whose recorded pid is gone are removed on the spot.
    pub fn is_live(&self, identity: &ProgramIdentity) -> bool {
        let Some(snapshot) = self.entry(identity) else {
            return false;
        };
        let Some(pid) = snapshot.pid else {
            return true;
        };
        if self.processes.is_alive(pid) {
            return true;
        }

        let mut entries = self.lock();
        // Only drop the entry we probed; a fresh registration may have
        // replaced it meanwhile.
        if entries.get(identity) == Some(&snapshot) {
            entries.remove(identity);
            debug!(workspace = %self.workspace, %identity, pid, "removed stale registry entry");
        }
        false
    }

    /// Clear the registry when no process of the managed family is running
    /// anywhere. Returns the number of entries dropped.
    ///
    /// Entries registered after the process search began are kept: they
    /// belong to launches that have not spawned yet.
    pub async fn sweep_if_no_related_processes(&self) -> usize {
        let searched_at = Instant::now();
        if self.family.any_alive(self.processes.as_ref()).await {
            return 0;
        }

        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.registered_at > searched_at);
        let dropped = before - entries.len();
        if dropped > 0 {
            info!(
                workspace = %self.workspace,
                dropped,
                "no related processes running; cleared launch registry"
            );
        }
        dropped
    }
}
