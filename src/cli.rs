//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use subgrab_core::video::SubtitleNaming;

/// Find and download English subtitles for a folder of videos.
///
/// Subgrab derives a catalog code from each video file name, looks it up on
/// SubtitleCat and writes the best-rated English subtitle beside the video.
#[derive(Parser, Debug)]
#[command(name = "subgrab")]
#[command(author, version, about)]
pub struct Args {
    /// Root directory to scan for videos (overrides `root_dir` in config)
    pub root_dir: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Maximum concurrent videos (1-64, default 10)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=64))]
    pub concurrency: Option<u8>,

    /// Process videos one at a time, in scan order
    #[arg(long, conflicts_with = "concurrent")]
    pub sequential: bool,

    /// Process videos through the worker pool even if the config says otherwise
    #[arg(long)]
    pub concurrent: bool,

    /// Simulate resolution without network access or writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Also process videos that already have a subtitle
    #[arg(long)]
    pub include_existing: bool,

    /// Subtitle file naming: `plain` (movie.srt) or `language` (movie.en.srt)
    #[arg(long)]
    pub naming: Option<SubtitleNaming>,

    /// Maximum simultaneous catalog requests (1-16, default 3)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub gate_capacity: Option<u8>,

    /// Write the final batch status and per-video results as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub status_json: Option<PathBuf>,
}
