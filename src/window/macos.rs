// src/window/macos.rs

use anyhow::{Context, Result};
use core_foundation::base::{CFType, TCFType};
use core_foundation::dictionary::{CFDictionary, CFDictionaryGetTypeID, CFDictionaryRef};
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_graphics::window::{
    copy_window_info, kCGNullWindowID, kCGWindowAlpha, kCGWindowBounds,
    kCGWindowListExcludeDesktopElements, kCGWindowListOptionOnScreenOnly, kCGWindowOwnerName,
    kCGWindowOwnerPID,
};
use tokio::process::Command;
use tracing::debug;

use super::WindowInfo;

type WindowDict = CFDictionary<CFString, CFType>;

pub(super) fn on_screen_windows() -> Vec<WindowInfo> {
    let options = kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements;
    let Some(list) = copy_window_info(options, kCGNullWindowID) else {
        debug!("window server returned no window list");
        return Vec::new();
    };

    let (pid_key, owner_key, bounds_key, alpha_key) = unsafe {
        (
            CFString::wrap_under_get_rule(kCGWindowOwnerPID),
            CFString::wrap_under_get_rule(kCGWindowOwnerName),
            CFString::wrap_under_get_rule(kCGWindowBounds),
            CFString::wrap_under_get_rule(kCGWindowAlpha),
        )
    };

    list.iter()
        .filter_map(|item| {
            // SAFETY: every element of the window list is a CFDictionary.
            let dict = unsafe { WindowDict::wrap_under_get_rule(*item as CFDictionaryRef) };

            let pid = number(&dict, &pid_key)?.to_i64()?;
            let owner_name = dict
                .find(&owner_key)
                .and_then(|v| v.downcast::<CFString>())
                .map(|s| s.to_string())
                .unwrap_or_default();
            let alpha = number(&dict, &alpha_key)
                .and_then(|n| n.to_f64())
                .unwrap_or(1.0);
            let (width, height) = bounds(&dict, &bounds_key)?;

            Some(WindowInfo {
                pid: u32::try_from(pid).ok()?,
                owner_name,
                width,
                height,
                alpha,
            })
        })
        .collect()
}

fn number(dict: &WindowDict, key: &CFString) -> Option<CFNumber> {
    dict.find(key).and_then(|v| v.downcast::<CFNumber>())
}

fn bounds(dict: &WindowDict, key: &CFString) -> Option<(f64, f64)> {
    let value = dict.find(key)?;
    if value.type_of() != unsafe { CFDictionaryGetTypeID() } {
        return None;
    }
    // SAFETY: type id checked above.
    let rect = unsafe { WindowDict::wrap_under_get_rule(value.as_CFTypeRef() as CFDictionaryRef) };
    let width = number(&rect, &CFString::from_static_string("Width"))?.to_f64()?;
    let height = number(&rect, &CFString::from_static_string("Height"))?.to_f64()?;
    Some((width, height))
}

pub(super) async fn activate(pid: u32) -> Result<()> {
    let script = format!(
        "tell application \"System Events\" to set frontmost of (first process whose unix id is {pid}) to true"
    );
    let output = Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .output()
        .await
        .context("running osascript")?;
    if !output.status.success() {
        anyhow::bail!(
            "activating pid {pid} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}
