// src/exec/mod.rs

//! Process launching layer.
//!
//! - [`request`] holds the immutable [`LaunchRequest`] and the concrete
//!   [`LaunchCommand`] derived from it.
//! - [`launcher`] starts a child in one of the three [`OutputMode`]s and
//!   exposes a single [`OutputStream`] of [`OutputEvent`]s.
//! - [`output`] splits raw byte streams into discrete lines.
//! - [`pty`] runs a child on a pseudo-terminal.
//!
//! [`OutputMode`]: crate::types::OutputMode

pub mod launcher;
pub mod output;
pub mod pty;
pub mod request;

pub use launcher::{OutputEvent, OutputStream, SPAWN_FAILED, launch};
pub use output::{LineSplitter, pump_lines};
pub use request::{LaunchCommand, LaunchRequest};
