// src/detect/mod.rs

//! Window-readiness detection.
//!
//! The compatibility layer never says "the window is up", so readiness is
//! inferred by polling three signals:
//! - a fresh running-record for the program (authoritative, immediate)
//! - whether anything of the managed family is still alive (early exit)
//! - a substantial on-screen window, confirmed over several ticks
//!
//! [`state`] is the pure, clock-free state machine; [`detector`] is the
//! async shell that samples the OS once per tick and feeds it.

pub mod detector;
pub mod state;

pub use detector::Detector;
pub use state::{DetectionState, Observation, Phase, Resolution, Signal};
