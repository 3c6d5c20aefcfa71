// src/exec/pty.rs

//! Pseudo-terminal launches.
//!
//! Some installer wrappers only print progress when stdout is a terminal,
//! so the child gets the slave side of a pty on stdin/stdout/stderr and we
//! read the master side. This runs on a blocking thread: `portable_pty`
//! readers are synchronous.

use std::io::Read;

use anyhow::{Context, Result};
use portable_pty::{Child, ChildKiller, CommandBuilder, PtyPair, PtySize, native_pty_system};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::launcher::{OutputEvent, SPAWN_FAILED};
use super::output::LineSplitter;
use super::request::LaunchCommand;

const PTY_ROWS: u16 = 24;
const PTY_COLS: u16 = 160;
const READ_CHUNK: usize = 8192;

/// Run `command` on a fresh pty, forwarding `Started` and `Line` events to
/// `tx`. Returns the exit code for the closing `Terminated` event.
///
/// Both pty ends are owned here and dropped on every return path.
pub fn run_on_pty(command: LaunchCommand, tx: mpsc::Sender<OutputEvent>) -> i32 {
    let PtyPair { master, slave } = match open_pair() {
        Ok(pair) => pair,
        Err(e) => return spawn_failed(&command, &e, &tx),
    };

    let spawned = slave.spawn_command(builder_for(&command));
    // Our copy of the slave must go, or the master never sees end-of-session.
    drop(slave);

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => return spawn_failed(&command, &e, &tx),
    };
    let _ = tx.blocking_send(OutputEvent::Started {
        pid: child.process_id(),
    });

    match master.try_clone_reader() {
        Ok(reader) => read_session(reader, &tx),
        Err(e) => {
            send_line(&tx, format!("cannot read pty output: {e}"));
            // Without a reader the child could block on a full pty buffer.
            let _ = child.kill();
        }
    }

    let code = wait_child(child.as_mut(), &tx);
    drop(master);
    code
}

fn open_pair() -> Result<PtyPair> {
    native_pty_system()
        .openpty(PtySize {
            rows: PTY_ROWS,
            cols: PTY_COLS,
            pixel_width: 0,
            pixel_height: 0,
        })
        .context("allocating pseudo-terminal")
}

fn builder_for(command: &LaunchCommand) -> CommandBuilder {
    let mut builder = CommandBuilder::new(&command.program);
    builder.args(&command.args);
    for (key, value) in &command.env {
        builder.env(key, value);
    }
    if let Some(ref cwd) = command.cwd {
        builder.cwd(cwd);
    }
    builder
}

fn read_session(mut reader: Box<dyn Read + Send>, tx: &mpsc::Sender<OutputEvent>) {
    let mut splitter = LineSplitter::new();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                for line in splitter.push(&buf[..n]) {
                    send_line_tagged(tx, line, false);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) if is_session_end(&e) => {
                debug!("pty session ended");
                break;
            }
            Err(e) => {
                send_line(tx, format!("pty read error: {e}"));
                break;
            }
        }
    }

    if let Some(line) = splitter.finish() {
        send_line_tagged(tx, line, false);
    }
}

/// Reading the master after every slave descriptor closed fails with EIO;
/// that is how a pty reports end-of-session.
fn is_session_end(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::EIO)
}

fn wait_child(child: &mut (dyn Child + Send + Sync), tx: &mpsc::Sender<OutputEvent>) -> i32 {
    match child.wait() {
        Ok(status) if status.success() => 0,
        Ok(status) => status.exit_code() as i32,
        Err(e) => {
            send_line(tx, format!("waiting for pty process failed: {e}"));
            -1
        }
    }
}

fn spawn_failed(
    command: &LaunchCommand,
    err: &dyn std::fmt::Display,
    tx: &mpsc::Sender<OutputEvent>,
) -> i32 {
    error!(program = ?command.program, error = %err, "failed to spawn process on pty");
    let _ = tx.blocking_send(OutputEvent::Started { pid: None });
    SPAWN_FAILED
}

fn send_line(tx: &mpsc::Sender<OutputEvent>, text: String) {
    send_line_tagged(tx, text, true);
}

fn send_line_tagged(tx: &mpsc::Sender<OutputEvent>, text: String, is_error: bool) {
    let _ = tx.blocking_send(OutputEvent::Line { text, is_error });
}
