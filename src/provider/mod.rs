//! Catalog providers and the fallback chain that orders them.
//!
//! # Architecture
//!
//! - [`Provider`] - Async trait each catalog client implements
//! - [`ProviderChain`] - Priority-ordered providers with first-success fallback
//! - [`SubtitleCatProvider`] - Search/select/link/download client for SubtitleCat-style sites
//! - [`SafeFetcher`] - Single-request primitive with retry and challenge detection
//!
//! # Example
//!
//! ```no_run
//! use subgrab_core::provider::{ProviderSettings, build_default_provider_chain};
//! use subgrab_core::resolution::ResolutionContext;
//! use subgrab_core::trace::TraceLog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = build_default_provider_chain(&ProviderSettings::default());
//! let ctx = ResolutionContext::default();
//! let log = TraceLog::new();
//!
//! let subtitle = chain.resolve("ABW-255", &ctx, &log).await?;
//! println!("{} bytes via {}", subtitle.content.len(), subtitle.provider);
//! # Ok(())
//! # }
//! ```

mod chain;
mod error;
mod fetch;
mod http_client;
pub mod search;
mod subtitlecat;

pub use chain::ProviderChain;
pub use error::{FetchError, ProviderError, ResolveError, Stage, StageError};
pub use fetch::{CHALLENGE_MARKERS, FetchedBody, SafeFetcher, looks_like_challenge};
pub use http_client::{DEFAULT_REQUEST_TIMEOUT_SECS, HttpSettings, build_provider_http_client};
pub use search::{Candidate, MatchMode};
pub use subtitlecat::{DEFAULT_BASE_URL, MIN_SUBTITLE_BYTES, SubtitleCatProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::resolution::ResolutionContext;
use crate::retry::RetryPolicy;
use crate::trace::TraceLog;

/// Priority level for provider ordering.
///
/// Lower sorts first; within one level, registration order is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPriority {
    /// Tried first.
    #[default]
    Primary = 0,
    /// Tried when primaries fail.
    Secondary = 1,
    /// Last resort.
    Fallback = 2,
}

/// A subtitle obtained from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleResult {
    /// Raw subtitle bytes (SRT text, arbitrary encoding).
    pub content: Vec<u8>,
    /// URL the content was fetched from.
    pub source_url: String,
    /// Name of the provider that produced it.
    pub provider: String,
    /// Title of the selected catalog entry.
    pub title: Option<String>,
}

impl SubtitleResult {
    /// Creates a result with no title.
    #[must_use]
    pub fn new(
        content: Vec<u8>,
        source_url: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            content,
            source_url: source_url.into(),
            provider: provider.into(),
            title: None,
        }
    }

    /// Attaches the catalog entry title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Network and retry settings shared by providers built from config.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// HTTP client settings.
    pub http: HttpSettings,
    /// Retry policy for each individual request.
    pub fetch_policy: RetryPolicy,
    /// Retry policy for each protocol stage.
    pub stage_policy: RetryPolicy,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            fetch_policy: RetryPolicy::fetch_default(),
            stage_policy: RetryPolicy::default(),
        }
    }
}

/// Declarative provider entry, as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Name used in logs and in [`SubtitleResult::provider`].
    pub name: String,
    /// Site root, e.g. `https://www.subtitlecat.com`.
    pub base_url: String,
    /// Title matching mode.
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Chain priority.
    #[serde(default)]
    pub priority: ProviderPriority,
}

impl ProviderSpec {
    /// The public SubtitleCat site with strict matching.
    #[must_use]
    pub fn subtitlecat() -> Self {
        Self {
            name: "subtitlecat".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            match_mode: MatchMode::Strict,
            priority: ProviderPriority::Primary,
        }
    }
}

/// Trait every catalog provider implements.
///
/// # Object Safety
///
/// Uses `async_trait` so providers can be stored as `Box<dyn Provider>` in
/// the chain; native async trait methods are not object-safe.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Returns the provider's name (e.g., "subtitlecat").
    fn name(&self) -> &str;

    /// Returns the provider's priority level.
    fn priority(&self) -> ProviderPriority;

    /// Attempts to fetch the English subtitle for `identifier`.
    ///
    /// Appends human-readable progress to `log`; never touches the filesystem.
    async fn resolve(
        &self,
        identifier: &str,
        ctx: &ResolutionContext,
        log: &TraceLog,
    ) -> Result<SubtitleResult, ProviderError>;
}

/// Builds a chain from config entries.
///
/// Entries whose client cannot be built are skipped with a warning.
#[must_use]
pub fn build_provider_chain(specs: &[ProviderSpec], settings: &ProviderSettings) -> ProviderChain {
    let mut chain = ProviderChain::new();
    for spec in specs {
        match SubtitleCatProvider::with_base_url(&spec.name, spec.base_url.clone(), settings) {
            Ok(provider) => chain.register(Box::new(
                provider
                    .with_match_mode(spec.match_mode)
                    .with_priority(spec.priority),
            )),
            Err(error) => warn!(
                provider = %spec.name,
                error = %error,
                "provider unavailable; continuing with remaining providers"
            ),
        }
    }
    chain
}

/// Builds the default chain: SubtitleCat only.
#[must_use]
pub fn build_default_provider_chain(settings: &ProviderSettings) -> ProviderChain {
    build_provider_chain(&[ProviderSpec::subtitlecat()], settings)
}
