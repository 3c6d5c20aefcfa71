#![allow(dead_code)]

use std::sync::Arc;

use winedeck::config::ConfigFile;
use winedeck::engine::{Workspace, WorkspaceDeps};
use winedeck::env::StandardEnvironment;
use winedeck::fs::FileSystem;
use winedeck_test_utils::fakes::{FakeProcesses, FakeWindows};

pub fn init_tracing() {
    winedeck_test_utils::init_tracing();
}

/// Workspace over fake processes/windows and the given filesystem.
pub fn fake_workspace(
    config: ConfigFile,
    processes: Arc<FakeProcesses>,
    windows: Arc<FakeWindows>,
    fs: Arc<dyn FileSystem>,
) -> Arc<Workspace> {
    let deps = WorkspaceDeps {
        processes,
        windows,
        fs,
        environment: Arc::new(StandardEnvironment),
        shortcuts: None,
    };
    Arc::new(Workspace::new(config, deps).expect("valid workspace"))
}
