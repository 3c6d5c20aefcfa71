// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [workspace]
/// name = "Steam"
/// prefix = "/Users/me/Bottles/Steam"
/// wine = "/opt/wine/bin/wine64"
///
/// [environment]
/// debug = "fixme-all"
///
/// [detection]
/// poll_interval = "1s"
/// max_attempts = 60
/// stability_threshold = 3
/// ```
///
/// Only `[workspace]` is required. Turn it into a [`ConfigFile`] with
/// `ConfigFile::try_from`, which validates and resolves durations.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub workspace: WorkspaceSection,

    #[serde(default)]
    pub environment: EnvironmentSection,

    #[serde(default)]
    pub detection: DetectionSection,

    #[serde(default)]
    pub family: FamilySection,
}

/// `[workspace]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceSection {
    /// Human-readable workspace identity, used in logs.
    pub name: String,

    /// The compatibility-layer prefix (exported as `WINEPREFIX`).
    pub prefix: PathBuf,

    /// Compatibility-layer binary used to start guest programs.
    pub wine: PathBuf,

    /// Directory holding running-records. Defaults to `<prefix>/.running`.
    #[serde(default)]
    pub running_dir: Option<PathBuf>,
}

/// `[environment]` section: inputs for the environment builder.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSection {
    /// `WINEDEBUG` channel spec.
    #[serde(default = "default_debug")]
    pub debug: String,

    #[serde(default = "default_true")]
    pub msync: bool,

    #[serde(default)]
    pub dxvk: bool,

    #[serde(default)]
    pub metal_hud: bool,

    /// Extra variables exported verbatim, applied after the flags above.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

fn default_debug() -> String {
    "fixme-all".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            debug: default_debug(),
            msync: true,
            dxvk: false,
            metal_hud: false,
            extra: BTreeMap::new(),
        }
    }
}

/// `[detection]` section, before duration parsing.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionSection {
    /// Duration string such as `"1s"` or `"250ms"`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: u32,

    #[serde(default = "default_min_window_side")]
    pub min_window_width: f64,

    #[serde(default = "default_min_window_side")]
    pub min_window_height: f64,
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_max_attempts() -> u32 {
    60
}

fn default_stability_threshold() -> u32 {
    3
}

fn default_min_window_side() -> f64 {
    100.0
}

impl Default for DetectionSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_attempts: default_max_attempts(),
            stability_threshold: default_stability_threshold(),
            min_window_width: default_min_window_side(),
            min_window_height: default_min_window_side(),
        }
    }
}

/// `[family]` section: how to recognise processes that belong to the
/// compatibility layer and its guests.
#[derive(Debug, Clone, Deserialize)]
pub struct FamilySection {
    /// Process / window-owner names of the runtime itself.
    #[serde(default = "default_family_names")]
    pub names: Vec<String>,

    /// Directories under the prefix whose command lines mark worker
    /// processes (matched by path, since guest binaries are arbitrary).
    #[serde(default = "default_worker_dirs")]
    pub worker_dirs: Vec<String>,
}

fn default_family_names() -> Vec<String> {
    ["wine", "wine64", "wine64-preloader", "wineserver"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_worker_dirs() -> Vec<String> {
    vec!["drive_c".to_string()]
}

impl Default for FamilySection {
    fn default() -> Self {
        Self {
            names: default_family_names(),
            worker_dirs: default_worker_dirs(),
        }
    }
}

/// Resolved readiness-detection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub stability_threshold: u32,
    pub min_window_width: f64,
    pub min_window_height: f64,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_attempts: default_max_attempts(),
            stability_threshold: default_stability_threshold(),
            min_window_width: default_min_window_side(),
            min_window_height: default_min_window_side(),
        }
    }
}

/// Validated configuration used by the rest of the crate.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub workspace: WorkspaceSection,
    pub environment: EnvironmentSection,
    pub detection: DetectionSettings,
    pub family: FamilySection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        workspace: WorkspaceSection,
        environment: EnvironmentSection,
        detection: DetectionSettings,
        family: FamilySection,
    ) -> Self {
        Self {
            workspace,
            environment,
            detection,
            family,
        }
    }

    /// Directory where guest runtimes announce themselves.
    pub fn running_dir(&self) -> PathBuf {
        self.workspace
            .running_dir
            .clone()
            .unwrap_or_else(|| self.workspace.prefix.join(".running"))
    }
}
