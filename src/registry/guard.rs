// src/registry/guard.rs

use std::sync::Arc;

use super::LaunchRegistry;
use crate::types::ProgramIdentity;

/// Holds a registry claim and releases it when dropped, on every exit path
/// of a launch (including panics and aborted tasks).
pub struct RegistrationGuard {
    registry: Arc<LaunchRegistry>,
    identity: ProgramIdentity,
}

impl RegistrationGuard {
    pub(super) fn new(registry: Arc<LaunchRegistry>, identity: ProgramIdentity) -> Self {
        Self { registry, identity }
    }

    pub fn identity(&self) -> &ProgramIdentity {
        &self.identity
    }

    pub fn attach_pid(&self, pid: u32) {
        self.registry.attach_pid(&self.identity, pid);
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.identity);
    }
}
