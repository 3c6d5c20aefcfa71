#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use winedeck::config::{
    ConfigFile, DetectionSection, EnvironmentSection, FamilySection, RawConfigFile,
    WorkspaceSection,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(prefix: impl AsRef<Path>) -> Self {
        Self {
            config: RawConfigFile {
                workspace: WorkspaceSection {
                    name: "test".to_string(),
                    prefix: prefix.as_ref().to_path_buf(),
                    wine: PathBuf::from("wine64"),
                    running_dir: None,
                },
                environment: EnvironmentSection::default(),
                detection: DetectionSection::default(),
                family: FamilySection::default(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.workspace.name = name.to_string();
        self
    }

    pub fn wine(mut self, wine: impl Into<PathBuf>) -> Self {
        self.config.workspace.wine = wine.into();
        self
    }

    pub fn running_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace.running_dir = Some(dir.into());
        self
    }

    pub fn poll_interval(mut self, interval: &str) -> Self {
        self.config.detection.poll_interval = interval.to_string();
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.detection.max_attempts = attempts;
        self
    }

    pub fn stability_threshold(mut self, ticks: u32) -> Self {
        self.config.detection.stability_threshold = ticks;
        self
    }

    pub fn env_var(mut self, key: &str, value: &str) -> Self {
        self.config
            .environment
            .extra
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn family_names(mut self, names: &[&str]) -> Self {
        self.config.family.names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// Empty `extra` map, handy for environment assertions.
pub fn no_overrides() -> BTreeMap<String, String> {
    BTreeMap::new()
}
