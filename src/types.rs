// src/types.rs

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

/// How a launched process's standard streams are wired.
///
/// - `Detached`: no pipes; used for interactive GUI programs whose output
///   would otherwise back up in unread pipe buffers.
/// - `Captured`: stdout and stderr are piped and merged into line events.
/// - `Pty`: a pseudo-terminal is attached to all three standard streams, for
///   tools that only report progress when they see a terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Detached,
    Captured,
    Pty,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detached" | "silent" => Ok(OutputMode::Detached),
            "captured" => Ok(OutputMode::Captured),
            "pty" => Ok(OutputMode::Pty),
            other => Err(format!(
                "invalid output mode: {other} (expected \"detached\", \"captured\" or \"pty\")"
            )),
        }
    }
}

/// Normalized identity of a guest program.
///
/// Two requests name the same program when their paths match after
/// separators are unified and case is folded, so `C:\App\x.exe` and
/// `c:/app/X.EXE` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramIdentity(String);

impl ProgramIdentity {
    pub fn new(raw: &str) -> Self {
        let unified = raw.trim().replace('\\', "/");
        let mut folded = unified.to_lowercase();
        while folded.len() > 1 && folded.ends_with('/') {
            folded.pop();
        }
        ProgramIdentity(folded)
    }

    /// Identity for an on-disk path, made absolute against the current
    /// directory when relative.
    pub fn from_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self::new(&absolute.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
