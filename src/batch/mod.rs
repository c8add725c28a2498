//! Batch orchestration across many videos.
//!
//! The [`BatchOrchestrator`] drives resolution and save for each
//! [`VideoDescriptor`] through a bounded worker pool and keeps a shared
//! [`BatchStatus`] current. Every per-video failure stays local to that
//! video.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use subgrab_core::batch::{BatchOptions, BatchOrchestrator, BatchStatus};
//! use subgrab_core::provider::{ProviderSettings, build_default_provider_chain};
//! use subgrab_core::resolution::ResolutionContext;
//! use subgrab_core::video::VideoDescriptor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = Arc::new(build_default_provider_chain(&ProviderSettings::default()));
//! let orchestrator = BatchOrchestrator::new(chain, Arc::new(ResolutionContext::default()));
//! let status = Arc::new(BatchStatus::new());
//!
//! let videos = vec![VideoDescriptor::new("/videos/[ABW-255].mp4", false)];
//! let finished = orchestrator
//!     .run(videos, &BatchOptions::default(), Arc::clone(&status))
//!     .await?;
//! println!("{} done, {} downloaded", finished.len(), status.downloaded());
//! # Ok(())
//! # }
//! ```

mod error;
mod status;
mod task;

pub use error::{BatchError, VideoError};
pub use status::{BatchSnapshot, BatchStatus};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::provider::ProviderChain;
use crate::resolution::ResolutionContext;
use crate::video::{SubtitleNaming, VideoDescriptor, VideoStatus};

use task::{TaskEnv, handle_task_join_error, process_video};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 64;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default synthetic delay for dry-run videos.
pub const DEFAULT_DRY_RUN_DELAY: Duration = Duration::from_secs(1);

/// Per-run switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Run videos through a worker pool instead of one at a time.
    pub concurrent: bool,
    /// Worker pool size when `concurrent` is set.
    pub max_concurrency: usize,
    /// Simulate success without network or filesystem access.
    pub dry_run: bool,
    /// Also count videos that already have a subtitle.
    pub include_existing: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrent: true,
            max_concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
            include_existing: false,
        }
    }
}

/// Drives a batch of videos through resolution and save.
pub struct BatchOrchestrator {
    chain: Arc<ProviderChain>,
    ctx: Arc<ResolutionContext>,
    naming: SubtitleNaming,
    dry_run_delay: Duration,
}

impl BatchOrchestrator {
    /// Creates an orchestrator over a chain and a shared resolution context.
    #[must_use]
    pub fn new(chain: Arc<ProviderChain>, ctx: Arc<ResolutionContext>) -> Self {
        Self {
            chain,
            ctx,
            naming: SubtitleNaming::default(),
            dry_run_delay: DEFAULT_DRY_RUN_DELAY,
        }
    }

    /// Sets how written subtitle files are named.
    #[must_use]
    pub fn with_naming(mut self, naming: SubtitleNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Sets the synthetic per-video delay used in dry-run mode.
    #[must_use]
    pub fn with_dry_run_delay(mut self, delay: Duration) -> Self {
        self.dry_run_delay = delay;
        self
    }

    /// The resolution context shared by all tasks.
    #[must_use]
    pub fn context(&self) -> &ResolutionContext {
        &self.ctx
    }

    /// Runs the batch and returns the descriptors in input order.
    ///
    /// When `include_existing` is false, videos that already have a
    /// subtitle are set aside: marked Success, logged as skipped and left
    /// out of every counter. `status.total` is fixed to the number of
    /// remaining videos before any task starts.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConcurrency`] if concurrent mode is
    /// requested with a pool size outside
    /// [`MIN_CONCURRENCY`]..=[`MAX_CONCURRENCY`], and
    /// [`BatchError::SemaphoreClosed`] if a worker slot cannot be acquired.
    ///
    /// Individual video failures do NOT cause this method to error.
    #[instrument(skip(self, videos, status), fields(videos = videos.len(), concurrent = options.concurrent))]
    pub async fn run(
        &self,
        videos: Vec<VideoDescriptor>,
        options: &BatchOptions,
        status: Arc<BatchStatus>,
    ) -> Result<Vec<VideoDescriptor>, BatchError> {
        if options.concurrent
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&options.max_concurrency)
        {
            return Err(BatchError::InvalidConcurrency {
                value: options.max_concurrency,
            });
        }

        let mut slots: Vec<Option<VideoDescriptor>> = Vec::with_capacity(videos.len());
        let mut work: Vec<(usize, VideoDescriptor)> = Vec::new();
        for (index, mut video) in videos.into_iter().enumerate() {
            if !options.include_existing && video.has_existing_subtitle {
                video.status = VideoStatus::Success;
                video.log.push("Subtitle already exists, skipped".to_string());
                slots.push(Some(video));
            } else {
                slots.push(None);
                work.push((index, video));
            }
        }

        status.begin(work.len());
        info!(
            total = work.len(),
            skipped = slots.len() - work.len(),
            dry_run = options.dry_run,
            "starting batch"
        );

        let env = Arc::new(TaskEnv {
            chain: Arc::clone(&self.chain),
            ctx: Arc::clone(&self.ctx),
            status: Arc::clone(&status),
            naming: self.naming,
            dry_run: options.dry_run,
            dry_run_delay: self.dry_run_delay,
        });

        let outcome = if options.concurrent {
            run_pool(&env, work, options.max_concurrency, &mut slots).await
        } else {
            for (index, video) in work {
                let finished = process_video(Arc::clone(&env), video).await;
                place(&mut slots, index, finished);
            }
            Ok(())
        };
        status.finish();
        outcome?;

        info!(
            processed = status.processed(),
            downloaded = status.downloaded(),
            failed = status.failed(),
            "batch complete"
        );

        Ok(slots.into_iter().flatten().collect())
    }
}

impl std::fmt::Debug for BatchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchOrchestrator")
            .field("chain", &self.chain)
            .field("naming", &self.naming)
            .field("dry_run_delay", &self.dry_run_delay)
            .finish_non_exhaustive()
    }
}

/// Steady-state pool: a new task starts as soon as any slot frees.
async fn run_pool(
    env: &Arc<TaskEnv>,
    work: Vec<(usize, VideoDescriptor)>,
    max_concurrency: usize,
    slots: &mut [Option<VideoDescriptor>],
) -> Result<(), BatchError> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let mut handles: Vec<(usize, VideoDescriptor, JoinHandle<VideoDescriptor>)> =
        Vec::with_capacity(work.len());

    for (index, video) in work {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|_| BatchError::SemaphoreClosed)?;

        debug!(index, video = %video.display_name(), "spawning video task");
        let fallback = video.clone();
        let env = Arc::clone(env);
        handles.push((
            index,
            fallback,
            tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;
                process_video(env, video).await
            }),
        ));
    }

    debug!(task_count = handles.len(), "waiting for video tasks to complete");
    for (index, fallback, handle) in handles {
        let finished = match handle.await {
            Ok(video) => video,
            Err(error) => handle_task_join_error(fallback, &error, &env.status),
        };
        place(slots, index, finished);
    }
    Ok(())
}

fn place(slots: &mut [Option<VideoDescriptor>], index: usize, video: VideoDescriptor) {
    if let Some(slot) = slots.get_mut(index) {
        *slot = Some(video);
    }
}
