use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::provider::ProviderChain;
use crate::resolution::{ResolutionContext, resolve_cached};
use crate::trace::TraceLog;
use crate::video::{SubtitleNaming, VideoDescriptor, VideoStatus};

use super::{BatchStatus, VideoError};

/// Everything a video task needs, shared by all tasks of one run.
pub(super) struct TaskEnv {
    pub(super) chain: Arc<ProviderChain>,
    pub(super) ctx: Arc<ResolutionContext>,
    pub(super) status: Arc<BatchStatus>,
    pub(super) naming: SubtitleNaming,
    pub(super) dry_run: bool,
    pub(super) dry_run_delay: Duration,
}

/// What a successful task did.
enum Outcome {
    AlreadyPresent,
    Simulated,
    Saved(PathBuf),
}

pub(super) async fn process_video(env: Arc<TaskEnv>, mut video: VideoDescriptor) -> VideoDescriptor {
    video.status = VideoStatus::Downloading;
    let name = video.display_name();

    match run_video(&env, &mut video).await {
        Ok(outcome) => {
            match outcome {
                Outcome::AlreadyPresent => video.log.push("Subtitle already exists".to_string()),
                Outcome::Simulated => video.log.push("Dry run: subtitle not written".to_string()),
                Outcome::Saved(path) => {
                    info!(video = %name, path = %path.display(), "subtitle saved");
                    video.log.push(format!("Saved subtitle to {}", path.display()));
                }
            }
            video.status = VideoStatus::Success;
            env.status.record_downloaded();
        }
        Err(error) => {
            warn!(video = %name, error = %error, "no subtitle for video");
            video.log.push(format!("Failed: {error}"));
            video.status = VideoStatus::Failed;
            env.status.record_failed();
        }
    }

    debug!(video = %name, status = %video.status, log = ?video.log, "video finished");
    video
}

async fn run_video(env: &TaskEnv, video: &mut VideoDescriptor) -> Result<Outcome, VideoError> {
    if video.has_existing_subtitle {
        return Ok(Outcome::AlreadyPresent);
    }

    let Some(identifier) = video.identifier.clone() else {
        return Err(VideoError::missing_identifier(&video.display_name()));
    };
    video.log.push(format!("Identifier: {identifier}"));

    if env.dry_run {
        tokio::time::sleep(env.dry_run_delay).await;
        return Ok(Outcome::Simulated);
    }

    let trace = TraceLog::new();
    let resolved = resolve_cached(&identifier, &env.chain, &env.ctx, &trace).await;
    video.log.extend(trace.into_entries());
    let subtitle = resolved?;

    let target = env.naming.subtitle_path(&video.path);
    tokio::fs::write(&target, &subtitle.content)
        .await
        .map_err(|source| VideoError::write(&target, source))?;

    Ok(Outcome::Saved(target))
}

/// Marks a video whose task panicked or was aborted as failed.
pub(super) fn handle_task_join_error(
    mut video: VideoDescriptor,
    error: &JoinError,
    status: &BatchStatus,
) -> VideoDescriptor {
    let error = VideoError::Task {
        file: video.display_name(),
        reason: error.to_string(),
    };
    warn!(error = %error, "video task did not complete");
    video.log.push(format!("Failed: {error}"));
    video.status = VideoStatus::Failed;
    status.record_failed();
    video
}
