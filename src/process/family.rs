// src/process/family.rs

use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::config::FamilySection;
use crate::errors::{Result, WinedeckError};
use crate::process::ProcessQuery;

/// The managed family: runtime helpers plus the guest programs they host.
///
/// Membership is fuzzy on purpose. Runtime helpers are recognised by name,
/// guest windows by an `.exe` owner name, and worker processes by the
/// prefix path on their command line.
#[derive(Debug, Clone)]
pub struct Family {
    owner_re: Regex,
    command_pattern: String,
}

impl Family {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let names: Vec<String> = names
            .iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            return Err(WinedeckError::ConfigError(
                "process family needs at least one name".to_string(),
            ));
        }

        let alternatives = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        let owner_re = RegexBuilder::new(&format!(r"^(?:{alternatives})$|\.exe$"))
            .case_insensitive(true)
            .build()
            .map_err(|e| WinedeckError::ConfigError(format!("family name pattern: {e}")))?;

        let ere_alternatives = names
            .iter()
            .map(|n| escape_ere(n))
            .collect::<Vec<_>>()
            .join("|");
        let command_pattern = format!("(^|/)({ere_alternatives})( |$)");

        Ok(Self {
            owner_re,
            command_pattern,
        })
    }

    pub fn from_section(section: &FamilySection) -> Result<Self> {
        Self::new(&section.names)
    }

    /// Whether a window owned by a process called `owner` belongs to us.
    pub fn owns_window(&self, owner: &str) -> bool {
        self.owner_re.is_match(owner.trim())
    }

    /// `pgrep -f` pattern matching runtime helper command lines.
    pub fn command_pattern(&self) -> &str {
        &self.command_pattern
    }

    /// Is any runtime helper alive anywhere on the system?
    pub async fn any_alive(&self, processes: &dyn ProcessQuery) -> bool {
        !processes.find_matching(&self.command_pattern).await.is_empty()
    }
}

/// `pgrep -f` pattern for worker processes started from `<prefix>/<dir>/`.
pub fn worker_pattern(prefix: &Path, dir: &str) -> String {
    let base = prefix.to_string_lossy();
    let base = base.trim_end_matches('/');
    let dir = dir.trim_matches('/');
    escape_ere(&format!("{base}/{dir}/"))
}

/// Escape POSIX extended-regex metacharacters.
fn escape_ere(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '.' | '[' | ']' | '(' | ')' | '*' | '+' | '?' | '{' | '}' | '|' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
