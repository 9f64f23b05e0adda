//! Command-line surface: command parsing, logging setup and the publish schedule.
//!
//! Started with no arguments the binary runs a publish cycle immediately and
//! then again after every configured interval, measured from the end of the
//! previous cycle. `sync` runs a single cycle; `reconcile` prints the drift
//! between the output directory and the published entries. All settings come
//! from the environment (see [`crate::load_config`]).

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::PublishConfig;
use crate::contract::{DocumentStore, SourceStore, VersionControl};
use crate::git::GitRepository;
use crate::notion::NotionClient;
use crate::storage::FsDocumentStore;
use crate::synchronise::{DriftReport, Outcome, PushOutcome, SyncReport, Synchroniser};

/// Publish ready Notion entries as Markdown posts in a git repository.
#[derive(Parser)]
#[clap(
    name = "notion-publish",
    version,
    about = "Publish ready Notion database entries as Markdown posts committed to a site repository"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run a publish cycle now and then on every interval (the default)
    Watch,
    /// Run exactly one publish cycle
    Sync,
    /// Report drift between the output directory and published entries
    Reconcile,
}

/// Install the global subscriber. With a log file the output is appended to it,
/// otherwise it goes to stderr. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

pub fn build_synchroniser(
    config: &PublishConfig,
) -> Synchroniser<NotionClient, GitRepository, FsDocumentStore> {
    Synchroniser::new(
        NotionClient::new(config.notion.clone()),
        GitRepository::new(&config.repo_dir),
        FsDocumentStore::new(&config.output_dir),
    )
}

/// Async entrypoint shared by `main` and integration tests.
pub async fn run(cli: Cli, config: PublishConfig) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Watch);
    info!(?command, "Starting");

    let synchroniser = build_synchroniser(&config);

    match command {
        Commands::Watch => watch(&synchroniser, config.interval).await,
        Commands::Sync => {
            let report = synchroniser.run_once().await?;
            print_sync_report(&report);
            Ok(())
        }
        Commands::Reconcile => {
            let drift = synchroniser.reconcile().await?;
            print_drift_report(&drift);
            Ok(())
        }
    }
}

/// Run cycles back to back with `interval` between the end of one and the start
/// of the next, until interrupted.
pub async fn watch<S, V, D>(synchroniser: &Synchroniser<S, V, D>, interval: Duration) -> Result<()>
where
    S: SourceStore,
    V: VersionControl,
    D: DocumentStore,
{
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    // the handler is installed on first poll; do that before any cycle runs so
    // an interrupt mid-cycle is held until the next wait
    tokio::select! {
        biased;
        signal = &mut shutdown => {
            signal.context("Failed to listen for interrupt")?;
            info!("Interrupt received, stopping");
            return Ok(());
        }
        _ = std::future::ready(()) => {}
    }

    loop {
        match synchroniser.run_once().await {
            Ok(report) => info!(
                entries = report.entries.len(),
                failed = report.failed().count(),
                "Cycle finished"
            ),
            Err(e) => error!(error = %e, "Cycle aborted, retrying after the interval"),
        }

        info!(next_in_secs = interval.as_secs(), "Waiting for next cycle");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            signal = &mut shutdown => {
                signal.context("Failed to listen for interrupt")?;
                info!("Interrupt received, stopping");
                return Ok(());
            }
        }
    }
}

fn print_sync_report(report: &SyncReport) {
    if report.is_empty() {
        println!("Nothing to publish.");
        return;
    }
    for entry in &report.entries {
        let file = entry.file_name.as_deref().unwrap_or("<no slug>");
        match &entry.outcome {
            Outcome::Success { committed: true } => println!("published  {file}"),
            Outcome::Success { committed: false } => println!("unchanged  {file}"),
            Outcome::Failed(e) => println!("FAILED     {file}: {e}"),
        }
    }
    match &report.push {
        PushOutcome::NotNeeded => {}
        PushOutcome::Pushed => println!("pushed"),
        PushOutcome::Failed(e) => println!("PUSH FAILED: {e}"),
    }
}

fn print_drift_report(drift: &DriftReport) {
    if drift.is_clean() {
        println!("Output directory matches published entries.");
        return;
    }
    for file in &drift.unacknowledged {
        println!("on disk, not published  {file}");
    }
    for file in &drift.missing_files {
        println!("published, not on disk  {file}");
    }
}
