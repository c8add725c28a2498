//! CLI entry point for subgrab.

use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use subgrab_core::batch::{BatchOrchestrator, BatchSnapshot, BatchStatus};
use subgrab_core::provider::{build_default_provider_chain, build_provider_chain};
use subgrab_core::resolution::ResolutionContext;
use subgrab_core::scan::scan_videos;
use subgrab_core::video::{VideoDescriptor, VideoStatus};
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod progress;
mod settings;

use cli::Args;

/// Process exit outcome derived from per-video results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Partial,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(outcome: ProcessExit) -> Self {
        match outcome {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Partial => ExitCode::from(2),
        }
    }
}

/// Maps downloaded and failed counts to the process exit outcome.
fn determine_exit_outcome(downloaded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if downloaded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[derive(Serialize)]
struct StatusReport<'a> {
    status: BatchSnapshot,
    videos: &'a [VideoDescriptor],
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = app_config::load_default_file_config()?;
    if loaded.loaded_from_file {
        debug!(path = ?loaded.path, "loaded config file");
    }
    let settings = settings::resolve_run_settings(&args, &loaded.config)?;

    info!(root_dir = %settings.root_dir.display(), "Subgrab starting");

    let videos = scan_videos(&settings.root_dir)
        .with_context(|| format!("Failed to scan '{}'", settings.root_dir.display()))?;
    if videos.is_empty() {
        info!("No video files found");
        if let Some(path) = &args.status_json {
            write_status_json(path, BatchStatus::new().snapshot(), &videos)?;
        }
        return Ok(ExitCode::SUCCESS);
    }
    info!(
        videos = videos.len(),
        with_subtitle = videos.iter().filter(|v| v.has_existing_subtitle).count(),
        "Scanned video directory"
    );

    let chain = match &settings.providers {
        Some(specs) => build_provider_chain(specs, &settings.provider_settings),
        None => build_default_provider_chain(&settings.provider_settings),
    };
    debug!(providers = ?chain.provider_names(), "provider chain ready");

    let orchestrator = BatchOrchestrator::new(
        Arc::new(chain),
        Arc::new(ResolutionContext::new(settings.gate_capacity)),
    )
    .with_naming(settings.naming)
    .with_dry_run_delay(settings.dry_run_delay);

    let status = Arc::new(BatchStatus::new());
    let (spinner, stop) = progress::spawn_progress_ui(
        progress::should_use_spinner(std::io::stderr().is_terminal(), args.quiet),
        Arc::clone(&status),
    );

    let result = orchestrator
        .run(videos, &settings.options, Arc::clone(&status))
        .await;

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = spinner {
        let _ = handle.await;
    }

    let finished = result?;
    for video in finished.iter().filter(|v| v.status == VideoStatus::Failed) {
        warn!(
            video = %video.display_name(),
            reason = video.log.last().map_or("unknown", String::as_str),
            "No subtitle"
        );
    }

    let snapshot = status.snapshot();
    info!(
        total = snapshot.total,
        downloaded = snapshot.downloaded,
        failed = snapshot.failed,
        elapsed_secs = snapshot.elapsed_secs.unwrap_or_default(),
        "Batch complete"
    );

    if let Some(path) = &args.status_json {
        write_status_json(path, snapshot.clone(), &finished)?;
    }

    Ok(determine_exit_outcome(snapshot.downloaded, snapshot.failed).into())
}

fn write_status_json(path: &Path, status: BatchSnapshot, videos: &[VideoDescriptor]) -> Result<()> {
    let report = StatusReport { status, videos };
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize batch status")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write status file '{}'", path.display()))?;
    info!(path = %path.display(), "Wrote batch status");
    Ok(())
}
