// src/exec/request.rs

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::types::{OutputMode, ProgramIdentity};

/// One request to run a guest program. Immutable once built.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    identity: ProgramIdentity,
    display_name: String,
    program: PathBuf,
    args: Vec<String>,
    mode: OutputMode,
}

impl LaunchRequest {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, mode: OutputMode) -> Self {
        let program = program.into();
        let display_name = program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string_lossy().into_owned());
        Self {
            identity: ProgramIdentity::from_path(&program),
            display_name,
            program,
            args,
            mode,
        }
    }

    pub fn identity(&self) -> &ProgramIdentity {
        &self.identity
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// File name of the guest binary, as it appears in running-records.
    pub fn executable_name(&self) -> String {
        self.program
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }
}

/// A fully-resolved command line ready to be spawned.
#[derive(Debug, Clone)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    pub mode: OutputMode,
}

impl LaunchCommand {
    pub fn new(program: impl Into<PathBuf>, mode: OutputMode) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            mode,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Command that runs `request` through the compatibility layer `wine`.
    ///
    /// Detached launches go through `start /unix`, which hands the program
    /// to the runtime and returns at once; the other modes run the program
    /// in the foreground so its exit code and output are meaningful.
    pub fn for_guest(request: &LaunchRequest, wine: &Path, env: BTreeMap<String, String>) -> Self {
        let mut command = Self::new(wine, request.mode());
        if request.mode() == OutputMode::Detached {
            command = command.args(["start", "/unix"]);
        }
        command = command
            .arg(request.program().as_os_str())
            .args(request.args().iter().cloned())
            .envs(env);
        if let Some(dir) = request.program().parent().filter(|d| !d.as_os_str().is_empty()) {
            command = command.cwd(dir);
        }
        command
    }

    pub(crate) fn tokio_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).envs(&self.env);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}
