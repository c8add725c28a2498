//! Progress UI (spinner) for batch runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use subgrab_core::batch::{BatchSnapshot, BatchStatus};

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    status: Arc<BatchStatus>,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(status, Arc::clone(&stop));
    (Some(handle), stop)
}

pub(crate) fn should_use_spinner(stderr_is_terminal: bool, quiet: bool) -> bool {
    stderr_is_terminal && !quiet && !is_dumb_terminal()
}

fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

fn spawn_spinner_inner(status: Arc<BatchStatus>, stop: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            spinner.set_message(progress_message(&status.snapshot()));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}

fn progress_message(snapshot: &BatchSnapshot) -> String {
    format!(
        "[{}/{}] Fetching subtitles... {} saved, {} failed",
        snapshot.processed.min(snapshot.total),
        snapshot.total,
        snapshot.downloaded,
        snapshot.failed
    )
}
