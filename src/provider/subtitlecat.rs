//! SubtitleCat catalog provider.
//!
//! Resolution runs three stages, each retried under the stage policy:
//! 1. search `index.php?search=<id>` and select the most downloaded match
//! 2. load the chosen result page and read the `download_en` link
//! 3. fetch the linked subtitle and check it is not empty or truncated
//!
//! Every request inside a stage goes through [`SafeFetcher`], which has its
//! own per-request retry policy and honours the shared concurrency gate.

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::resolution::ResolutionContext;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::trace::TraceLog;

use super::fetch::SafeFetcher;
use super::http_client::build_provider_http_client;
use super::search::{self, Candidate, MatchMode};
use super::{
    Provider, ProviderError, ProviderPriority, ProviderSettings, Stage, StageError,
    SubtitleResult,
};

/// Public SubtitleCat endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.subtitlecat.com";

/// Smallest payload accepted as a subtitle file.
pub const MIN_SUBTITLE_BYTES: usize = 32;

const PROVIDER_NAME: &str = "subtitlecat";

/// Catalog client for SubtitleCat-style sites.
pub struct SubtitleCatProvider {
    name: String,
    base_url: String,
    match_mode: MatchMode,
    priority: ProviderPriority,
    fetcher: SafeFetcher,
    stage_policy: RetryPolicy,
}

impl SubtitleCatProvider {
    /// Creates a provider for the public SubtitleCat site.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the HTTP client cannot be constructed.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Self::with_base_url(PROVIDER_NAME, DEFAULT_BASE_URL, settings)
    }

    /// Creates a provider against a custom endpoint (mirrors, integration tests).
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the HTTP client cannot be constructed.
    #[tracing::instrument(skip(base_url, settings), fields(provider = %name))]
    pub fn with_base_url(
        name: &str,
        base_url: impl Into<String>,
        settings: &ProviderSettings,
    ) -> Result<Self, ProviderError> {
        let client = build_provider_http_client(name, &settings.http)?;
        Ok(Self {
            name: name.to_string(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            match_mode: MatchMode::Strict,
            priority: ProviderPriority::Primary,
            fetcher: SafeFetcher::new(client, settings.fetch_policy.clone(), log_label(name)),
            stage_policy: settings.stage_policy.clone(),
        })
    }

    /// Sets how result titles are matched.
    #[must_use]
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    /// Sets the chain priority.
    #[must_use]
    pub fn with_priority(mut self, priority: ProviderPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn label(&self) -> String {
        log_label(&self.name)
    }

    fn search_url(&self, identifier: &str) -> String {
        format!(
            "{}/index.php?search={}",
            self.base_url,
            urlencoding::encode(identifier)
        )
    }

    /// Joins a page href onto the provider base.
    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        if href.starts_with('/') {
            format!("{}{href}", self.base_url)
        } else {
            format!("{}/{href}", self.base_url)
        }
    }

    async fn search_and_select(
        &self,
        identifier: &str,
        ctx: &ResolutionContext,
        log: &TraceLog,
    ) -> Result<Candidate, StageError> {
        let url = self.search_url(identifier);
        log.push(format!("[{}] Searching: {url}", self.label()));

        let page = self.fetcher.fetch(&url, ctx, log).await?;
        let candidates = search::parse_candidates(&page.text(), identifier, self.match_mode)?;

        for candidate in &candidates {
            log.push(format!(
                "[{}] Candidate: '{}' ({} downloads)",
                self.label(),
                candidate.title,
                candidate.download_count
            ));
        }

        let Some(best) = search::select_best(&candidates) else {
            log.push(format!("[{}] No matching titles found", self.label()));
            return Err(StageError::NoMatchingCandidate {
                identifier: identifier.to_string(),
            });
        };

        log.push(format!("[{}] Best match → {}", self.label(), best.href));
        Ok(best.clone())
    }

    async fn english_link(
        &self,
        page_url: &str,
        ctx: &ResolutionContext,
        log: &TraceLog,
    ) -> Result<String, StageError> {
        log.push(format!("[{}] Loading subtitle page: {page_url}", self.label()));

        let page = self.fetcher.fetch(page_url, ctx, log).await?;
        let Some(href) = search::find_english_link(&page.text()) else {
            log.push(format!("[{}] No English subtitle link found", self.label()));
            return Err(StageError::NoEnglishLink);
        };

        log.push(format!("[{}] English subtitle link → {href}", self.label()));
        Ok(self.absolute_url(&href))
    }

    async fn download(
        &self,
        url: &str,
        ctx: &ResolutionContext,
        log: &TraceLog,
    ) -> Result<Vec<u8>, StageError> {
        let body = self.fetcher.fetch(url, ctx, log).await?;
        if body.bytes.len() < MIN_SUBTITLE_BYTES {
            log.push(format!(
                "[{}] Downloaded content too small ({} bytes)",
                self.label(),
                body.bytes.len()
            ));
            return Err(StageError::ContentTooSmall {
                len: body.bytes.len(),
                min: MIN_SUBTITLE_BYTES,
            });
        }
        Ok(body.bytes)
    }

    /// Runs one stage under the stage policy.
    async fn run_stage<T, F, Fut>(
        &self,
        stage: Stage,
        log: &TraceLog,
        mut attempt_stage: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let max_attempts = self.stage_policy.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            log.push(format!(
                "[{}] {} attempt {attempt}/{max_attempts}",
                self.label(),
                capitalize(stage.as_str())
            ));

            let error = match attempt_stage().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.stage_policy.should_retry(error.failure_type(), attempt) {
                RetryDecision::Retry { delay, .. } => {
                    debug!(
                        provider = %self.name,
                        %stage,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying stage"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    log.push(format!(
                        "[{}] Failed {} after retries: {error}",
                        self.label(),
                        stage.as_str()
                    ));
                    debug!(provider = %self.name, %stage, %reason, "stage gave up");
                    return Err(ProviderError::stage_failed(&self.name, stage, attempt, error));
                }
            }
        }
    }
}

fn log_label(name: &str) -> String {
    match name {
        PROVIDER_NAME => "SubCat".to_string(),
        other => other.to_string(),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl std::fmt::Debug for SubtitleCatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleCatProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("match_mode", &self.match_mode)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for SubtitleCatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> ProviderPriority {
        self.priority
    }

    #[tracing::instrument(skip(self, ctx, log), fields(provider = %self.name, identifier = %identifier))]
    async fn resolve(
        &self,
        identifier: &str,
        ctx: &ResolutionContext,
        log: &TraceLog,
    ) -> Result<SubtitleResult, ProviderError> {
        let best = self
            .run_stage(Stage::Search, log, || {
                self.search_and_select(identifier, ctx, log)
            })
            .await?;

        let page_url = self.absolute_url(&best.href);
        let english_url = self
            .run_stage(Stage::EnglishLink, log, || {
                self.english_link(&page_url, ctx, log)
            })
            .await?;

        log.push(format!("[{}] Downloading: {english_url}", self.label()));
        let content = self
            .run_stage(Stage::Content, log, || self.download(&english_url, ctx, log))
            .await?;

        log.push(format!("[{}] Download successful", self.label()));
        info!(
            provider = %self.name,
            identifier,
            bytes = content.len(),
            "subtitle resolved"
        );

        Ok(SubtitleResult::new(content, english_url, self.name.clone()).with_title(best.title))
    }
}
