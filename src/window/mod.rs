// src/window/mod.rs

//! On-screen window enumeration and application activation.
//!
//! The detector and reaper only see [`WindowSource`]. On macOS
//! [`SystemWindows`] reads the window server's list and raises programs via
//! System Events; elsewhere it reports no windows, which degrades readiness
//! detection to the record and liveness signals.

#[cfg(target_os = "macos")]
mod macos;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::process::BoxFuture;

/// One entry of the on-screen window list.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub pid: u32,
    pub owner_name: String,
    pub width: f64,
    pub height: f64,
    /// 0.0 (transparent) to 1.0 (opaque).
    pub alpha: f64,
}

impl WindowInfo {
    /// Large enough and fully opaque: splash screens, tooltips and
    /// invisible helper windows fail this.
    pub fn is_substantial(&self, min_width: f64, min_height: f64) -> bool {
        self.width > min_width && self.height > min_height && self.alpha >= 1.0
    }
}

/// Trait abstracting the OS window list.
pub trait WindowSource: Send + Sync {
    fn on_screen_windows(&self) -> Vec<WindowInfo>;

    /// Raise the windows of `pid` and make it the active application.
    fn activate<'a>(&'a self, pid: u32) -> BoxFuture<'a, Result<()>>;
}

/// Production window source for the current platform.
#[derive(Debug, Clone, Default)]
pub struct SystemWindows;

impl WindowSource for SystemWindows {
    fn on_screen_windows(&self) -> Vec<WindowInfo> {
        #[cfg(target_os = "macos")]
        {
            macos::on_screen_windows()
        }
        #[cfg(not(target_os = "macos"))]
        {
            Vec::new()
        }
    }

    fn activate<'a>(&'a self, pid: u32) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            #[cfg(target_os = "macos")]
            {
                macos::activate(pid).await
            }
            #[cfg(not(target_os = "macos"))]
            {
                tracing::debug!(pid, "window activation unsupported on this platform");
                Ok(())
            }
        })
    }
}

/// Query `windows` on the blocking pool; the window server call can stall.
pub async fn list_on_screen(windows: &Arc<dyn WindowSource>) -> Vec<WindowInfo> {
    let windows = Arc::clone(windows);
    match tokio::task::spawn_blocking(move || windows.on_screen_windows()).await {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "window enumeration failed");
            Vec::new()
        }
    }
}
