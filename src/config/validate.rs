// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, DetectionSection, DetectionSettings, RawConfigFile};
use crate::errors::{Result, WinedeckError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = WinedeckError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_workspace(&raw)?;
        validate_family(&raw)?;
        let detection = resolve_detection(&raw.detection)?;
        Ok(ConfigFile::new_unchecked(
            raw.workspace,
            raw.environment,
            detection,
            raw.family,
        ))
    }
}

fn validate_workspace(cfg: &RawConfigFile) -> Result<()> {
    let ws = &cfg.workspace;
    if ws.name.trim().is_empty() {
        return Err(config_error("[workspace].name must not be empty"));
    }
    if ws.prefix.as_os_str().is_empty() {
        return Err(config_error("[workspace].prefix must not be empty"));
    }
    if ws.wine.as_os_str().is_empty() {
        return Err(config_error("[workspace].wine must not be empty"));
    }
    Ok(())
}

fn validate_family(cfg: &RawConfigFile) -> Result<()> {
    if cfg.family.names.iter().all(|n| n.trim().is_empty()) {
        return Err(config_error(
            "[family].names must contain at least one process name",
        ));
    }
    Ok(())
}

fn resolve_detection(section: &DetectionSection) -> Result<DetectionSettings> {
    let poll_interval = parse_duration(&section.poll_interval).map_err(|e| {
        WinedeckError::ConfigError(format!("[detection].poll_interval: {e}"))
    })?;
    if poll_interval.is_zero() {
        return Err(config_error("[detection].poll_interval must be > 0"));
    }
    if section.max_attempts == 0 {
        return Err(config_error("[detection].max_attempts must be >= 1 (got 0)"));
    }
    if section.stability_threshold == 0 {
        return Err(config_error(
            "[detection].stability_threshold must be >= 1 (got 0)",
        ));
    }
    if section.min_window_width < 0.0 || section.min_window_height < 0.0 {
        return Err(config_error("[detection] minimum window size must not be negative"));
    }

    Ok(DetectionSettings {
        poll_interval,
        max_attempts: section.max_attempts,
        stability_threshold: section.stability_threshold,
        min_window_width: section.min_window_width,
        min_window_height: section.min_window_height,
    })
}

fn config_error(msg: &str) -> WinedeckError {
    WinedeckError::ConfigError(msg.to_string())
}

/// Parse a simple duration string like `"1s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
