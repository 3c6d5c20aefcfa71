// src/engine/workspace.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::detect::{Detector, Resolution, Signal};
use crate::env::{EnvironmentBuilder, StandardEnvironment, identity_overrides};
use crate::errors::Result;
use crate::exec::{LaunchCommand, LaunchRequest, OutputEvent, launch};
use crate::fs::{FileSystem, RealFileSystem};
use crate::process::{Family, ProcessQuery, SystemProcesses};
use crate::reaper::Reaper;
use crate::records::{RecordStore, spawn_record_sweeper};
use crate::registry::LaunchRegistry;
use crate::shortcut::{ShortcutResolver, resolve_target};
use crate::types::OutputMode;
use crate::window::{SystemWindows, WindowSource};

/// How a launch ended, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The program was already running; its window was focused instead.
    AlreadyRunning,
    /// The process could not be spawned.
    SpawnFailed,
    /// A captured or pty process ran to completion.
    Completed { exit_code: i32 },
    /// A detached program showed a ready window.
    Ready { pid: u32, via: Signal },
    /// Detection timed out; the program keeps running in the background.
    Background,
    /// Nothing related was left running before a window appeared.
    Exited,
}

/// External collaborators of a workspace. Production code uses
/// [`WorkspaceDeps::system`]; tests swap in fakes.
#[derive(Clone)]
pub struct WorkspaceDeps {
    pub processes: Arc<dyn ProcessQuery>,
    pub windows: Arc<dyn WindowSource>,
    pub fs: Arc<dyn FileSystem>,
    pub environment: Arc<dyn EnvironmentBuilder>,
    pub shortcuts: Option<Arc<dyn ShortcutResolver>>,
}

impl WorkspaceDeps {
    pub fn system() -> Self {
        Self {
            processes: Arc::new(SystemProcesses),
            windows: Arc::new(SystemWindows),
            fs: Arc::new(RealFileSystem),
            environment: Arc::new(StandardEnvironment),
            shortcuts: None,
        }
    }
}

/// One workspace: a prefix, its launch registry and its running-records.
///
/// Construct once and share (`Arc<Workspace>`) with every caller.
pub struct Workspace {
    config: ConfigFile,
    deps: WorkspaceDeps,
    family: Family,
    registry: Arc<LaunchRegistry>,
    records: Arc<RecordStore>,
    detector: Detector,
}

impl Workspace {
    pub fn new(config: ConfigFile, deps: WorkspaceDeps) -> Result<Self> {
        let family = Family::from_section(&config.family)?;
        let registry = Arc::new(LaunchRegistry::new(
            config.workspace.name.clone(),
            Arc::clone(&deps.processes),
            family.clone(),
        ));
        let records = Arc::new(RecordStore::new(
            config.running_dir(),
            Arc::clone(&deps.fs),
            Arc::clone(&deps.processes),
        ));
        let detector = Detector::new(
            config.detection.clone(),
            Arc::clone(&records),
            Arc::clone(&deps.processes),
            Arc::clone(&deps.windows),
            family.clone(),
        );

        Ok(Self {
            config,
            deps,
            family,
            registry,
            records,
            detector,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.workspace.name
    }

    pub fn registry(&self) -> &Arc<LaunchRegistry> {
        &self.registry
    }

    pub fn records(&self) -> &Arc<RecordStore> {
        &self.records
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Reaper covering the managed family and this workspace's workers.
    pub fn reaper(&self) -> Reaper {
        Reaper::new(
            Arc::clone(&self.deps.processes),
            Arc::clone(&self.deps.windows),
            self.family.clone(),
        )
        .with_worker_dirs(&self.config.workspace.prefix, &self.config.family.worker_dirs)
    }

    /// Keep the running directory free of stale records.
    pub fn spawn_record_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        spawn_record_sweeper(Arc::clone(&self.records), interval)
    }

    /// Build a request for `requested`, resolving shortcuts to their target.
    pub fn request(
        &self,
        requested: &Path,
        args: Vec<String>,
        mode: OutputMode,
    ) -> Result<LaunchRequest> {
        let program: PathBuf = resolve_target(
            requested,
            &self.config.workspace.prefix,
            self.deps.shortcuts.as_deref(),
        )?;
        if program != requested {
            debug!(shortcut = ?requested, target = ?program, "resolved shortcut");
        }
        Ok(LaunchRequest::new(program, args, mode))
    }

    /// Run `request` on its own task.
    ///
    /// Dropping the handle does not cancel the launch: registry cleanup and
    /// detection still run to completion.
    pub fn spawn_open(
        self: &Arc<Self>,
        request: LaunchRequest,
        tap: Option<mpsc::Sender<OutputEvent>>,
    ) -> JoinHandle<LaunchOutcome> {
        let workspace = Arc::clone(self);
        tokio::spawn(async move { workspace.open(request, tap).await })
    }

    /// Launch `request` and wait for the outcome. Every event of the launch
    /// is forwarded to `tap` when given.
    pub async fn open(
        &self,
        request: LaunchRequest,
        tap: Option<mpsc::Sender<OutputEvent>>,
    ) -> LaunchOutcome {
        let identity = request.identity().clone();
        let executable = request.executable_name();

        self.registry.sweep_if_no_related_processes().await;

        let guard = match self.registry.try_acquire(&identity) {
            Some(guard) => guard,
            None if self.registry.is_live(&identity) => {
                info!(workspace = self.name(), program = %executable, "already running; focusing it");
                self.detector.focus_existing(&executable).await;
                return LaunchOutcome::AlreadyRunning;
            }
            // The stale entry was just healed by `is_live`; one more try.
            None => match self.registry.try_acquire(&identity) {
                Some(guard) => guard,
                None => return LaunchOutcome::AlreadyRunning,
            },
        };

        let started_at = Utc::now();
        let overrides = identity_overrides(&request, self.records.dir());
        let env = self.deps.environment.build(&self.config, &overrides);
        let command = LaunchCommand::for_guest(&request, &self.config.workspace.wine, env);

        info!(
            workspace = self.name(),
            program = %request.display_name(),
            mode = ?request.mode(),
            "opening program"
        );

        let mut stream = launch(command);
        let mut spawned = false;
        let mut exit_code = crate::exec::SPAWN_FAILED;

        while let Some(event) = stream.next().await {
            match &event {
                OutputEvent::Started { pid } => {
                    spawned = pid.is_some();
                    // A detached spawn is only the `start` wrapper; its pid
                    // says nothing about whether the guest lives.
                    if let (Some(pid), false) = (pid, request.mode() == OutputMode::Detached) {
                        guard.attach_pid(*pid);
                    }
                }
                OutputEvent::Line { text, is_error } => {
                    debug!(program = %executable, is_error, "{}", text);
                }
                OutputEvent::Terminated(code) => exit_code = *code,
            }
            if let Some(ref tap) = tap {
                let _ = tap.send(event).await;
            }
        }

        if !spawned {
            warn!(program = %executable, "launch failed to spawn");
            return LaunchOutcome::SpawnFailed;
        }
        if request.mode() != OutputMode::Detached {
            return LaunchOutcome::Completed { exit_code };
        }

        match self.detector.wait_until_ready(&executable, started_at).await {
            Resolution::Found { via, pid } => LaunchOutcome::Ready { pid, via },
            Resolution::TimedOut => LaunchOutcome::Background,
            Resolution::ProcessExited => LaunchOutcome::Exited,
        }
        // `guard` drops here and releases the identity.
    }
}
