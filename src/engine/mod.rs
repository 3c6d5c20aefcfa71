// src/engine/mod.rs

//! Launch orchestration for one workspace.
//!
//! [`Workspace`] wires the registry, launcher, detector and reaper
//! together:
//!
//! sweep registry -> resolve shortcut -> claim identity -> build
//! environment -> launch -> drain events -> (detached) detect readiness ->
//! release identity.

pub mod workspace;

pub use workspace::{LaunchOutcome, Workspace, WorkspaceDeps};
