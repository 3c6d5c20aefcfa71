// src/exec/launcher.rs

//! Start a child process and turn everything it does into one ordered
//! sequence of [`OutputEvent`]s:
//!
//! `Started`, then zero or more `Line`s, then exactly one `Terminated`.
//!
//! Spawn failures never escape as errors; they show up as `Started`
//! followed by `Terminated(SPAWN_FAILED)`.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdout};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::output::pump_lines;
use super::pty;
use super::request::LaunchCommand;
use crate::types::OutputMode;

/// Exit code reported when the process could not be started at all.
pub const SPAWN_FAILED: i32 = -1;

const EVENT_BUFFER: usize = 256;

/// After the child exits, how long its output pipes may stay open (held by
/// daemonised grandchildren such as `wineserver`) before we stop reading.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// The launch attempt began. `pid` is set when a process was spawned.
    Started { pid: Option<u32> },
    Line { text: String, is_error: bool },
    /// Closes the sequence. Carries the exit code, or [`SPAWN_FAILED`].
    Terminated(i32),
}

/// Receiving end of one launch's event sequence.
///
/// The stream itself keeps the sequence well-formed, whatever the producer
/// did: it always opens with `Started` and closes with one `Terminated`.
pub struct OutputStream {
    rx: mpsc::Receiver<OutputEvent>,
    started: bool,
    finished: bool,
    held: Option<OutputEvent>,
}

impl OutputStream {
    /// Wrap the receiving side of a launch's event channel.
    pub fn from_receiver(rx: mpsc::Receiver<OutputEvent>) -> Self {
        Self {
            rx,
            started: false,
            finished: false,
            held: None,
        }
    }

    /// Next event, or `None` once `Terminated` has been yielded.
    ///
    /// If the producer vanishes without terminating the sequence, a
    /// `Terminated(SPAWN_FAILED)` is synthesized so the sequence still ends.
    /// If it never announced `Started` (a launch task that panicked before
    /// spawning), `Started { pid: None }` is synthesized ahead of its first
    /// event.
    pub async fn next(&mut self) -> Option<OutputEvent> {
        if self.finished {
            return None;
        }
        if let Some(event) = self.held.take() {
            return Some(self.emit(event));
        }

        let event = match self.rx.recv().await {
            Some(event) => event,
            None => {
                warn!("launch task ended without a terminal event");
                OutputEvent::Terminated(SPAWN_FAILED)
            }
        };
        if !self.started && !matches!(event, OutputEvent::Started { .. }) {
            warn!(?event, "launch task skipped its Started event");
            self.held = Some(event);
            return Some(self.emit(OutputEvent::Started { pid: None }));
        }
        Some(self.emit(event))
    }

    fn emit(&mut self, event: OutputEvent) -> OutputEvent {
        match event {
            OutputEvent::Started { .. } => self.started = true,
            OutputEvent::Terminated(_) => {
                self.finished = true;
                self.rx.close();
            }
            OutputEvent::Line { .. } => {}
        }
        event
    }

    /// Drain the whole sequence.
    pub async fn collect(mut self) -> Vec<OutputEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Launch `command` on its own task and return its event sequence.
///
/// Must be called from within a Tokio runtime.
pub fn launch(command: LaunchCommand) -> OutputStream {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(run_launch(command, tx));
    OutputStream::from_receiver(rx)
}

async fn run_launch(command: LaunchCommand, tx: mpsc::Sender<OutputEvent>) {
    info!(
        program = ?command.program,
        mode = ?command.mode,
        "launching process"
    );

    let code = match command.mode {
        OutputMode::Detached => run_detached(&command, &tx).await,
        OutputMode::Captured => run_captured(&command, &tx).await,
        OutputMode::Pty => {
            let pty_tx = tx.clone();
            match tokio::task::spawn_blocking(move || pty::run_on_pty(command, pty_tx)).await {
                Ok(code) => code,
                // `OutputStream` fills in `Started` if the task died first.
                Err(e) => {
                    error!(error = %e, "pty launch task failed");
                    SPAWN_FAILED
                }
            }
        }
    };

    debug!(exit_code = code, "launch finished");
    let _ = tx.send(OutputEvent::Terminated(code)).await;
}

async fn run_detached(command: &LaunchCommand, tx: &mpsc::Sender<OutputEvent>) -> i32 {
    let mut cmd = command.tokio_command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    // Keep terminal signals aimed at us (Ctrl-C) away from the guest.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return report_spawn_failure(command, &e, tx).await,
    };
    let pid = child.id();
    let _ = tx.send(OutputEvent::Started { pid }).await;

    // Reap the child in the background so it never lingers as a zombie.
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(?pid, code = ?status.code(), "detached process exited"),
            Err(e) => debug!(?pid, error = %e, "waiting for detached process failed"),
        }
    });

    0
}

async fn run_captured(command: &LaunchCommand, tx: &mpsc::Sender<OutputEvent>) -> i32 {
    let mut cmd = command.tokio_command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => return report_spawn_failure(command, &e, tx).await,
    };
    let pid = child.id();
    let _ = tx.send(OutputEvent::Started { pid }).await;

    let mut stdout = tokio::spawn(pump_stdout(child.stdout.take(), tx.clone()));
    let mut stderr = tokio::spawn(pump_stderr(child.stderr.take(), tx.clone()));

    let code = wait_for_exit(&mut child, tx).await;

    // Both readers must finish before Terminated goes out, otherwise
    // trailing diagnostics race the exit and get lost.
    let drained = tokio::time::timeout(DRAIN_GRACE, async {
        let (out, err) = tokio::join!(&mut stdout, &mut stderr);
        (out.unwrap_or(0), err.unwrap_or(0))
    })
    .await;
    match drained {
        Ok((out_lines, err_lines)) => {
            debug!(?pid, out_lines, err_lines, "process output drained");
        }
        Err(_) => {
            warn!(
                ?pid,
                grace = ?DRAIN_GRACE,
                "output pipes still open after exit (inherited by a descendant); giving up on them"
            );
            stdout.abort();
            stderr.abort();
            // Wait for the aborts to land so no Line can follow Terminated.
            let _ = tokio::join!(stdout, stderr);
        }
    }

    code
}

async fn pump_stdout(stdout: Option<ChildStdout>, tx: mpsc::Sender<OutputEvent>) -> usize {
    match stdout {
        Some(stdout) => pump_lines(stdout, false, tx).await,
        None => 0,
    }
}

async fn pump_stderr(stderr: Option<ChildStderr>, tx: mpsc::Sender<OutputEvent>) -> usize {
    match stderr {
        Some(stderr) => pump_lines(stderr, true, tx).await,
        None => 0,
    }
}

async fn wait_for_exit(child: &mut Child, tx: &mpsc::Sender<OutputEvent>) -> i32 {
    match child.wait().await {
        Ok(status) => {
            let code = status.code().unwrap_or(-1);
            info!(
                pid = ?child.id(),
                exit_code = code,
                success = status.success(),
                "process exited"
            );
            code
        }
        Err(e) => {
            let _ = tx
                .send(OutputEvent::Line {
                    text: format!("waiting for process failed: {e}"),
                    is_error: true,
                })
                .await;
            -1
        }
    }
}

async fn report_spawn_failure(
    command: &LaunchCommand,
    err: &std::io::Error,
    tx: &mpsc::Sender<OutputEvent>,
) -> i32 {
    error!(program = ?command.program, error = %err, "failed to spawn process");
    let _ = tx.send(OutputEvent::Started { pid: None }).await;
    SPAWN_FAILED
}
