// src/env.rs

//! Child-process environment.
//!
//! The [`EnvironmentBuilder`] turns a workspace configuration into the
//! variable set for the compatibility layer; the launch flow then layers
//! identity markers for the guest program on top.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ConfigFile;
use crate::exec::LaunchRequest;

/// Full path of the guest program being launched.
pub const PROGRAM_VAR: &str = "WINEDECK_PROGRAM";
/// File name of the guest program, as it should appear in its record.
pub const PROGRAM_NAME_VAR: &str = "WINEDECK_PROGRAM_NAME";
/// Where the guest runtime should write its running-record.
pub const RUNNING_DIR_VAR: &str = "WINEDECK_RUNNING_DIR";

pub trait EnvironmentBuilder: Send + Sync {
    /// Variables for a child of `config`'s workspace. `overrides` win over
    /// everything the builder derives itself.
    fn build(
        &self,
        config: &ConfigFile,
        overrides: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String>;
}

/// Default builder: prefix, debug channels and the backend toggles from
/// `[environment]`.
#[derive(Debug, Clone, Default)]
pub struct StandardEnvironment;

impl EnvironmentBuilder for StandardEnvironment {
    fn build(
        &self,
        config: &ConfigFile,
        overrides: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let env_cfg = &config.environment;
        let mut vars = BTreeMap::new();

        vars.insert(
            "WINEPREFIX".to_string(),
            config.workspace.prefix.to_string_lossy().into_owned(),
        );
        vars.insert("WINEDEBUG".to_string(), env_cfg.debug.clone());
        if env_cfg.msync {
            vars.insert("WINEMSYNC".to_string(), "1".to_string());
        }
        if env_cfg.dxvk {
            vars.insert(
                "WINEDLLOVERRIDES".to_string(),
                "dxgi,d3d9,d3d10core,d3d11=n,b".to_string(),
            );
        }
        if env_cfg.metal_hud {
            vars.insert("MTL_HUD_ENABLED".to_string(), "1".to_string());
        }

        vars.extend(env_cfg.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}

/// Markers that let the guest runtime announce itself under the right name
/// in the right directory.
pub fn identity_overrides(request: &LaunchRequest, running_dir: &Path) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            PROGRAM_VAR.to_string(),
            request.program().to_string_lossy().into_owned(),
        ),
        (PROGRAM_NAME_VAR.to_string(), request.executable_name()),
        (
            RUNNING_DIR_VAR.to_string(),
            running_dir.to_string_lossy().into_owned(),
        ),
    ])
}
