// tests/config_loading.rs

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tempfile::NamedTempFile;
use winedeck::cli::CliArgs;
use winedeck::config::{default_config_path, load_and_validate, parse_duration};
use winedeck::errors::WinedeckError;
use winedeck::process::Family;

fn config_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{body}").unwrap();
    file
}

#[test]
fn minimal_config_gets_defaults() {
    let file = config_file(
        r#"
[workspace]
name = "Steam"
prefix = "/Users/me/Bottles/Steam"
wine = "/opt/wine/bin/wine64"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.workspace.name, "Steam");
    assert_eq!(cfg.running_dir(), PathBuf::from("/Users/me/Bottles/Steam/.running"));
    assert_eq!(cfg.environment.debug, "fixme-all");
    assert!(cfg.environment.msync);
    assert!(!cfg.environment.dxvk);
    assert_eq!(cfg.detection.poll_interval, Duration::from_secs(1));
    assert_eq!(cfg.detection.max_attempts, 60);
    assert_eq!(cfg.detection.stability_threshold, 3);
    assert_eq!(cfg.detection.min_window_width, 100.0);
    assert_eq!(cfg.family.worker_dirs, vec!["drive_c".to_string()]);

    let family = Family::from_section(&cfg.family).unwrap();
    assert!(family.owns_window("wine64-preloader"));
    assert!(family.owns_window("SETUP.EXE"));
    assert!(!family.owns_window("Finder"));
}

#[test]
fn every_section_can_be_overridden() {
    let file = config_file(
        r#"
[workspace]
name = "Games"
prefix = "/p"
wine = "/opt/wine/bin/wine64"
running_dir = "/tmp/records"

[environment]
debug = "-all"
msync = false
dxvk = true
metal_hud = true

[environment.extra]
LANG = "ja_JP.UTF-8"

[detection]
poll_interval = "250ms"
max_attempts = 10
stability_threshold = 2
min_window_width = 320
min_window_height = 200.5

[family]
names = ["wine", "wineserver", "CrossOver"]
worker_dirs = ["drive_c", "dosdevices"]
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.running_dir(), Path::new("/tmp/records"));
    assert_eq!(cfg.environment.debug, "-all");
    assert!(!cfg.environment.msync);
    assert!(cfg.environment.dxvk && cfg.environment.metal_hud);
    assert_eq!(cfg.environment.extra.get("LANG").map(String::as_str), Some("ja_JP.UTF-8"));
    assert_eq!(cfg.detection.poll_interval, Duration::from_millis(250));
    assert_eq!(cfg.detection.max_attempts, 10);
    assert_eq!(cfg.detection.stability_threshold, 2);
    assert_eq!(cfg.detection.min_window_width, 320.0);
    assert_eq!(cfg.detection.min_window_height, 200.5);
    assert_eq!(cfg.family.names.len(), 3);
}

#[test]
fn missing_workspace_section_is_a_toml_error() {
    let file = config_file("[detection]\nmax_attempts = 5\n");

    match load_and_validate(file.path()) {
        Err(WinedeckError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    match load_and_validate("/definitely/not/here/Winedeck.toml") {
        Err(WinedeckError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        Err(e) => panic!("Expected IoError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn invalid_values_return_config_errors() {
    let cases = [
        ("name = \"\"\nprefix = \"/p\"\nwine = \"wine\"", "", "name"),
        ("name = \"x\"\nprefix = \"/p\"\nwine = \"\"", "", "wine"),
        (
            "name = \"x\"\nprefix = \"/p\"\nwine = \"wine\"",
            "[detection]\npoll_interval = \"0s\"",
            "poll_interval",
        ),
        (
            "name = \"x\"\nprefix = \"/p\"\nwine = \"wine\"",
            "[detection]\npoll_interval = \"5 fortnights\"",
            "poll_interval",
        ),
        (
            "name = \"x\"\nprefix = \"/p\"\nwine = \"wine\"",
            "[detection]\nmax_attempts = 0",
            "max_attempts",
        ),
        (
            "name = \"x\"\nprefix = \"/p\"\nwine = \"wine\"",
            "[detection]\nstability_threshold = 0",
            "stability_threshold",
        ),
        (
            "name = \"x\"\nprefix = \"/p\"\nwine = \"wine\"",
            "[family]\nnames = [\" \"]",
            "[family].names",
        ),
    ];

    for (workspace, extra, needle) in cases {
        let file = config_file(&format!("[workspace]\n{workspace}\n\n{extra}\n"));
        match load_and_validate(file.path()) {
            Err(WinedeckError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "{msg:?} should mention {needle}")
            }
            Err(e) => panic!("Expected ConfigError for {needle}, got: {:?}", e),
            Ok(_) => panic!("Expected error for {needle}, got Ok"),
        }
    }
}

#[test]
fn durations_accept_the_usual_units() {
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration(" 2s ").unwrap(), Duration::from_secs(2));
    assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("ms").is_err());
    assert!(parse_duration("3d").is_err());
}

#[test]
fn cli_reads_winedeck_toml_from_the_working_directory_by_default() {
    let args = CliArgs::try_parse_from(["winedeck", "check"]).unwrap();
    assert_eq!(args.config, default_config_path());
    assert_eq!(args.config, PathBuf::from("Winedeck.toml"));

    let args = CliArgs::try_parse_from(["winedeck", "--config", "/etc/wd.toml", "reap"]).unwrap();
    assert_eq!(args.config, PathBuf::from("/etc/wd.toml"));
}
