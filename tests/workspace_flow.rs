// tests/workspace_flow.rs
mod common;
use crate::common::{fake_workspace, init_tracing};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tempfile::{TempDir, tempdir};
use tokio::sync::mpsc;
use winedeck::config::ConfigFile;
use winedeck::detect::Signal;
use winedeck::engine::{LaunchOutcome, Workspace, WorkspaceDeps};
use winedeck::env::StandardEnvironment;
use winedeck::errors::WinedeckError;
use winedeck::exec::OutputEvent;
use winedeck::fs::mock::MockFileSystem;
use winedeck::fs::FileSystem;
use winedeck::shortcut::ShortcutResolver;
use winedeck::types::OutputMode;
use winedeck_test_utils::builders::ConfigFileBuilder;
use winedeck_test_utils::fakes::{FakeProcesses, FakeWindows, window};
use winedeck_test_utils::{eventually, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A prefix on disk with a `drive_c` to launch from.
fn prefix() -> std::io::Result<TempDir> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("drive_c"))?;
    Ok(dir)
}

fn config(prefix: &Path) -> ConfigFileBuilder {
    ConfigFileBuilder::new(prefix)
        .wine("/bin/sh")
        .running_dir(prefix.join(".running"))
        .poll_interval("10ms")
        .max_attempts(50)
}

fn write_script(prefix: &Path, name: &str, body: &str) -> std::io::Result<PathBuf> {
    let path = prefix.join("drive_c").join(name);
    fs::write(&path, body)?;
    Ok(path)
}

fn family_alive() -> Arc<FakeProcesses> {
    Arc::new(FakeProcesses::new().with_process(1, "/opt/wine/bin/wineserver"))
}

fn mock_fs() -> Arc<dyn FileSystem> {
    Arc::new(MockFileSystem::new())
}

async fn drain(mut rx: mpsc::Receiver<OutputEvent>) -> Vec<OutputEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn captured_launch_completes_with_the_workspace_environment() -> TestResult {
    init_tracing();

    let prefix = prefix()?;
    let script = write_script(
        prefix.path(),
        "hello.sh",
        "echo \"$WINEDECK_PROGRAM_NAME in $WINEPREFIX\"\necho \"debug=$WINEDEBUG\" >&2\nexit 0\n",
    )?;
    let ws = fake_workspace(
        config(prefix.path()).build(),
        family_alive(),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    let request = ws.request(&script, Vec::new(), OutputMode::Captured)?;
    let (tx, rx) = mpsc::channel(64);
    let outcome = with_timeout(ws.open(request, Some(tx))).await;

    assert_eq!(outcome, LaunchOutcome::Completed { exit_code: 0 });
    assert!(ws.registry().is_empty());

    let events = drain(rx).await;
    assert!(matches!(events.first(), Some(OutputEvent::Started { pid: Some(_) })));
    assert_eq!(events.last(), Some(&OutputEvent::Terminated(0)));
    let expected = format!("hello.sh in {}", prefix.path().display());
    assert!(events.contains(&OutputEvent::Line {
        text: expected,
        is_error: false
    }));
    assert!(events.contains(&OutputEvent::Line {
        text: "debug=fixme-all".to_string(),
        is_error: true
    }));
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_reported_as_completed() -> TestResult {
    let prefix = prefix()?;
    let script = write_script(prefix.path(), "fail.sh", "exit 7\n")?;
    let ws = fake_workspace(
        config(prefix.path()).build(),
        family_alive(),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    let request = ws.request(&script, Vec::new(), OutputMode::Pty)?;
    let outcome = with_timeout(ws.open(request, None)).await;

    assert_eq!(outcome, LaunchOutcome::Completed { exit_code: 7 });
    assert!(ws.registry().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_compatibility_layer_is_a_spawn_failure() -> TestResult {
    init_tracing();

    let prefix = prefix()?;
    let ws = fake_workspace(
        config(prefix.path()).wine("/definitely/not/wine64").build(),
        family_alive(),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    for mode in [OutputMode::Detached, OutputMode::Captured, OutputMode::Pty] {
        let request = ws.request(&prefix.path().join("drive_c/app.exe"), Vec::new(), mode)?;
        let outcome = with_timeout(ws.open(request, None)).await;
        assert_eq!(outcome, LaunchOutcome::SpawnFailed, "mode {mode:?}");
        assert!(ws.registry().is_empty(), "mode {mode:?} leaked a registration");
    }
    Ok(())
}

#[tokio::test]
async fn detached_launch_becomes_ready_when_a_window_settles() -> TestResult {
    init_tracing();

    let prefix = prefix()?;
    let windows = Arc::new(FakeWindows::new());
    windows.set_windows(vec![window(500, "game.exe")]);
    let ws = fake_workspace(
        config(prefix.path()).build(),
        family_alive(),
        windows.clone(),
        mock_fs(),
    );

    let request = ws.request(&prefix.path().join("drive_c/game.exe"), Vec::new(), OutputMode::Detached)?;
    let outcome = with_timeout(ws.open(request, None)).await;

    assert_eq!(
        outcome,
        LaunchOutcome::Ready {
            pid: 500,
            via: Signal::Window
        }
    );
    assert_eq!(windows.activated(), vec![500]);
    assert!(ws.registry().is_empty());
    Ok(())
}

#[tokio::test]
async fn detached_launch_uses_a_fresh_running_record() -> TestResult {
    init_tracing();

    let prefix = prefix()?;
    let running_dir = prefix.path().join(".running");
    let fs = MockFileSystem::new();
    fs.add_file(
        running_dir.join("game.json"),
        format!(
            r#"{{"executableName":"game.exe","fullPath":"C:\\game.exe","processId":321,"startedAt":"{}"}}"#,
            (Utc::now() + TimeDelta::minutes(1)).to_rfc3339()
        ),
    );
    let processes = family_alive();
    processes.spawn(321, "C:\\game.exe");
    let windows = Arc::new(FakeWindows::new());
    let ws = fake_workspace(
        config(prefix.path()).build(),
        processes,
        windows.clone(),
        Arc::new(fs),
    );

    let request = ws.request(&prefix.path().join("drive_c/game.exe"), Vec::new(), OutputMode::Detached)?;
    let outcome = with_timeout(ws.open(request, None)).await;

    assert_eq!(
        outcome,
        LaunchOutcome::Ready {
            pid: 321,
            via: Signal::Record
        }
    );
    assert_eq!(windows.activated(), vec![321]);
    Ok(())
}

#[tokio::test]
async fn detached_launch_without_window_stays_in_background() -> TestResult {
    let prefix = prefix()?;
    let ws = fake_workspace(
        config(prefix.path()).max_attempts(3).build(),
        family_alive(),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    let request = ws.request(&prefix.path().join("drive_c/tray.exe"), Vec::new(), OutputMode::Detached)?;
    let outcome = with_timeout(ws.open(request, None)).await;

    assert_eq!(outcome, LaunchOutcome::Background);
    assert!(ws.registry().is_empty());
    Ok(())
}

#[tokio::test]
async fn detached_launch_with_nothing_running_reports_exit() -> TestResult {
    let prefix = prefix()?;
    let ws = fake_workspace(
        config(prefix.path()).build(),
        Arc::new(FakeProcesses::new()),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    let request = ws.request(&prefix.path().join("drive_c/crash.exe"), Vec::new(), OutputMode::Detached)?;
    let outcome = with_timeout(ws.open(request, None)).await;

    assert_eq!(outcome, LaunchOutcome::Exited);
    Ok(())
}

#[tokio::test]
async fn second_launch_focuses_the_running_instance() -> TestResult {
    init_tracing();

    let prefix = prefix()?;
    let windows = Arc::new(FakeWindows::new());
    windows.set_windows(vec![window(600, "steam.exe")]);
    let ws = fake_workspace(
        config(prefix.path()).build(),
        family_alive(),
        windows.clone(),
        mock_fs(),
    );

    let request = ws.request(&prefix.path().join("drive_c/steam.exe"), Vec::new(), OutputMode::Detached)?;
    assert!(ws.registry().try_register(request.identity()));

    let outcome = with_timeout(ws.open(request.clone(), None)).await;

    assert_eq!(outcome, LaunchOutcome::AlreadyRunning);
    assert_eq!(windows.activated(), vec![600]);
    assert!(ws.registry().entry(request.identity()).is_some());
    Ok(())
}

#[tokio::test]
async fn concurrent_launches_of_one_program_spawn_once() -> TestResult {
    init_tracing();

    let prefix = prefix()?;
    let windows = Arc::new(FakeWindows::new());
    windows.set_windows(vec![window(700, "game.exe")]);
    let ws = fake_workspace(
        config(prefix.path()).build(),
        family_alive(),
        windows,
        mock_fs(),
    );

    let program = prefix.path().join("drive_c/game.exe");
    let first = ws.spawn_open(ws.request(&program, Vec::new(), OutputMode::Detached)?, None);
    let second = ws.spawn_open(ws.request(&program, Vec::new(), OutputMode::Detached)?, None);

    let mut outcomes = vec![with_timeout(first).await?, with_timeout(second).await?];
    outcomes.sort_by_key(|o| matches!(o, LaunchOutcome::AlreadyRunning));

    assert_eq!(
        outcomes,
        vec![
            LaunchOutcome::Ready {
                pid: 700,
                via: Signal::Window
            },
            LaunchOutcome::AlreadyRunning
        ]
    );
    assert!(ws.registry().is_empty());
    Ok(())
}

#[tokio::test]
async fn stale_registration_does_not_block_a_new_launch() -> TestResult {
    let prefix = prefix()?;
    let script = write_script(prefix.path(), "tool.sh", "echo ran\n")?;
    let ws = fake_workspace(
        config(prefix.path()).build(),
        family_alive(),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    let request = ws.request(&script, Vec::new(), OutputMode::Captured)?;
    assert!(ws.registry().try_register(request.identity()));
    ws.registry().attach_pid(request.identity(), 999_999);

    let outcome = with_timeout(ws.open(request, None)).await;
    assert_eq!(outcome, LaunchOutcome::Completed { exit_code: 0 });
    Ok(())
}

#[tokio::test]
async fn registry_is_swept_when_no_family_process_survives() -> TestResult {
    let prefix = prefix()?;
    let script = write_script(prefix.path(), "tool.sh", "true\n")?;
    let ws = fake_workspace(
        config(prefix.path()).build(),
        Arc::new(FakeProcesses::new()),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    let leftover = ws.request(&prefix.path().join("drive_c/old.exe"), Vec::new(), OutputMode::Detached)?;
    assert!(ws.registry().try_register(leftover.identity()));

    let request = ws.request(&script, Vec::new(), OutputMode::Captured)?;
    let outcome = with_timeout(ws.open(request, None)).await;

    assert_eq!(outcome, LaunchOutcome::Completed { exit_code: 0 });
    assert!(ws.registry().entry(leftover.identity()).is_none());
    Ok(())
}

#[tokio::test]
async fn dropped_handle_still_releases_the_registration() -> TestResult {
    let prefix = prefix()?;
    let script = write_script(prefix.path(), "slow.sh", "sleep 0.2\necho done\n")?;
    let ws = fake_workspace(
        config(prefix.path()).build(),
        family_alive(),
        Arc::new(FakeWindows::new()),
        mock_fs(),
    );

    let request = ws.request(&script, Vec::new(), OutputMode::Captured)?;
    let (tx, rx) = mpsc::channel(64);
    drop(ws.spawn_open(request, Some(tx)));

    let events = with_timeout(drain(rx)).await;
    assert_eq!(events.last(), Some(&OutputEvent::Terminated(0)));

    eventually(|| ws.registry().is_empty()).await;
    Ok(())
}

struct FixedShortcut(PathBuf);

impl ShortcutResolver for FixedShortcut {
    fn resolve(&self, _shortcut: &Path, prefix_root: &Path) -> Option<PathBuf> {
        Some(prefix_root.join(&self.0))
    }
}

fn workspace_with_shortcuts(config: ConfigFile, resolver: Option<Arc<dyn ShortcutResolver>>) -> Workspace {
    let deps = WorkspaceDeps {
        processes: Arc::new(FakeProcesses::new()),
        windows: Arc::new(FakeWindows::new()),
        fs: mock_fs(),
        environment: Arc::new(StandardEnvironment),
        shortcuts: resolver,
    };
    Workspace::new(config, deps).expect("valid workspace")
}

#[test]
fn shortcuts_resolve_to_their_target() -> TestResult {
    let prefix = prefix()?;
    let link = prefix.path().join("drive_c/users/Desktop/Game.LNK");

    let ws = workspace_with_shortcuts(config(prefix.path()).build(), None);
    match ws.request(&link, Vec::new(), OutputMode::Detached) {
        Err(WinedeckError::Shortcut { path, .. }) => assert_eq!(path, link),
        other => panic!("expected a shortcut error, got {other:?}"),
    }

    let resolver: Arc<dyn ShortcutResolver> = Arc::new(FixedShortcut(PathBuf::from("drive_c/Games/game.exe")));
    let ws = workspace_with_shortcuts(config(prefix.path()).build(), Some(resolver));
    let request = ws.request(&link, vec!["-windowed".to_string()], OutputMode::Detached)?;

    assert_eq!(request.program(), prefix.path().join("drive_c/Games/game.exe"));
    assert_eq!(request.executable_name(), "game.exe");
    assert_eq!(request.display_name(), "game");
    assert_eq!(request.args(), ["-windowed".to_string()]);
    Ok(())
}
