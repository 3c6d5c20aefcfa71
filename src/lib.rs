// src/lib.rs

pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod env;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod process;
pub mod reaper;
pub mod records;
pub mod registry;
pub mod shortcut;
pub mod types;
pub mod window;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, load_and_validate};
use crate::engine::{LaunchOutcome, Workspace, WorkspaceDeps};
use crate::errors::WinedeckError;
use crate::exec::OutputEvent;
use crate::types::OutputMode;

/// How often the running directory is swept while a launch is in progress.
const RECORD_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    match args.command {
        Command::Check => {
            print_config(&cfg);
            Ok(())
        }
        Command::Running => list_running(cfg),
        Command::Reap => {
            let workspace = Workspace::new(cfg, WorkspaceDeps::system())?;
            let report = workspace.reaper().reap().await;
            println!(
                "reaped {} process(es): {} by window, {} by command line",
                report.total(),
                report.window_owners,
                report.pattern_matches
            );
            Ok(())
        }
        Command::Run {
            program,
            mode,
            args,
        } => run_program(cfg, program, args, mode).await,
    }
}

/// Launch one program and report how it went.
///
/// Ctrl-C while waiting runs the reaper, since the guest and its helpers
/// would otherwise outlive us.
async fn run_program(
    cfg: ConfigFile,
    program: PathBuf,
    args: Vec<String>,
    mode: OutputMode,
) -> Result<()> {
    let workspace = Arc::new(Workspace::new(cfg, WorkspaceDeps::system())?);
    let sweeper = workspace.spawn_record_sweeper(RECORD_SWEEP_INTERVAL);

    let request = workspace.request(&program, args, mode)?;
    let (tap_tx, tap_rx) = mpsc::channel::<OutputEvent>(256);
    let printer = tokio::spawn(print_lines(tap_rx));

    let launch = workspace.spawn_open(request, Some(tap_tx));

    let outcome = tokio::select! {
        joined = launch => joined?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl+C");
            }
            info!("interrupted; force-quitting workspace processes");
            let report = workspace.reaper().reap().await;
            sweeper.abort();
            bail!("interrupted (reaped {} process(es))", report.total());
        }
    };

    sweeper.abort();
    let _ = printer.await;

    match outcome {
        LaunchOutcome::AlreadyRunning => println!("already running; focused existing window"),
        LaunchOutcome::Ready { pid, via } => {
            println!("ready (pid {pid}, detected via {})", via.as_str())
        }
        LaunchOutcome::Background => println!("no window yet; program continues in the background"),
        LaunchOutcome::Exited => println!("program exited before showing a window"),
        LaunchOutcome::Completed { exit_code: 0 } => {}
        LaunchOutcome::Completed { exit_code } => bail!("program exited with code {exit_code}"),
        LaunchOutcome::SpawnFailed => {
            return Err(WinedeckError::Spawn {
                program,
                reason: "the compatibility layer could not be started".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

async fn print_lines(mut rx: mpsc::Receiver<OutputEvent>) {
    while let Some(event) = rx.recv().await {
        if let OutputEvent::Line { text, is_error } = event {
            if is_error {
                eprintln!("{text}");
            } else {
                println!("{text}");
            }
        }
    }
}

fn list_running(cfg: ConfigFile) -> Result<()> {
    let workspace = Workspace::new(cfg, WorkspaceDeps::system())?;
    let report = workspace.records().sweep();
    let records = workspace.records().live_records();

    println!(
        "workspace {} ({} running, {} stale record(s) removed)",
        workspace.name(),
        records.len(),
        report.removed
    );
    for record in records {
        println!(
            "  - {} (pid {}, since {})",
            record.executable_name,
            record.process_id,
            record.started_at.to_rfc3339()
        );
        println!("      {}", record.full_path);
    }
    Ok(())
}

/// Print the resolved configuration.
fn print_config(cfg: &ConfigFile) {
    println!("winedeck check");
    println!("  workspace: {}", cfg.workspace.name);
    println!("  prefix: {}", cfg.workspace.prefix.display());
    println!("  wine: {}", cfg.workspace.wine.display());
    println!("  running_dir: {}", cfg.running_dir().display());
    println!();
    println!("detection:");
    println!("  poll_interval: {:?}", cfg.detection.poll_interval);
    println!("  max_attempts: {}", cfg.detection.max_attempts);
    println!("  stability_threshold: {}", cfg.detection.stability_threshold);
    println!(
        "  min_window: {}x{}",
        cfg.detection.min_window_width, cfg.detection.min_window_height
    );
    println!();
    println!("family:");
    println!("  names: {:?}", cfg.family.names);
    println!("  worker_dirs: {:?}", cfg.family.worker_dirs);
}
