// src/shortcut.rs

//! Shortcut (`.lnk`) handling at the launch boundary.
//!
//! Decoding the binary shortcut format is someone else's job; this module
//! only decides when a resolver is needed and turns its answer into a path
//! to launch.

use std::path::{Path, PathBuf};

use crate::errors::{Result, WinedeckError};

pub trait ShortcutResolver: Send + Sync {
    /// Target executable of `shortcut`, mapped into `prefix_root`.
    fn resolve(&self, shortcut: &Path, prefix_root: &Path) -> Option<PathBuf>;
}

pub fn is_shortcut(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("lnk"))
}

/// The executable to launch for `requested`: itself, or the target of the
/// shortcut it names.
pub fn resolve_target(
    requested: &Path,
    prefix_root: &Path,
    resolver: Option<&dyn ShortcutResolver>,
) -> Result<PathBuf> {
    if !is_shortcut(requested) {
        return Ok(requested.to_path_buf());
    }
    let resolver = resolver.ok_or_else(|| WinedeckError::Shortcut {
        path: requested.to_path_buf(),
        reason: "no shortcut resolver configured".to_string(),
    })?;
    resolver
        .resolve(requested, prefix_root)
        .ok_or_else(|| WinedeckError::Shortcut {
            path: requested.to_path_buf(),
            reason: "shortcut has no executable target".to_string(),
        })
}
