//! Error types for catalog provider operations.
//!
//! Errors are layered the way a resolution runs:
//! - [`FetchError`] - one safe-fetch request (after its own retries)
//! - [`StageError`] - one attempt of a protocol stage
//! - [`ProviderError`] - a provider giving up on an identifier
//! - [`ResolveError`] - the whole provider chain giving up

use std::fmt;

use thiserror::Error;

use crate::retry::FailureType;

/// Protocol stage of a catalog resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Search results fetch and candidate selection.
    Search,
    /// Result page fetch and English download link lookup.
    EnglishLink,
    /// Subtitle content fetch.
    Content,
}

impl Stage {
    /// Returns the label used in trace logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::EnglishLink => "english link",
            Self::Content => "download",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single catalog request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The malformed URL.
        url: String,
    },

    /// The response was an anti-bot interstitial page.
    #[error("anti-bot challenge served for {url}")]
    Challenge {
        /// The URL that was challenged.
        url: String,
    },

    /// Non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Request exceeded the configured timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Transport-level failure (DNS, connection refused, reset, ...).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Every attempt allowed by the fetch policy failed.
    #[error("request to {url} failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// The URL that kept failing.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Description of the final failure.
        last: String,
    },

    /// The concurrency gate was closed.
    #[error("concurrency gate closed before {url} could be fetched")]
    GateClosed {
        /// The URL that was waiting.
        url: String,
    },
}

impl FetchError {
    /// Classifies a reqwest error for `url`.
    #[must_use]
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source: error,
            }
        }
    }

    /// Retry classification of this error.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Challenge { .. } => FailureType::Challenge,
            Self::HttpStatus { .. }
            | Self::Timeout { .. }
            | Self::Network { .. }
            | Self::Exhausted { .. } => FailureType::Transient,
            Self::InvalidUrl { .. } | Self::GateClosed { .. } => FailureType::Permanent,
        }
    }
}

/// Failure of one protocol stage attempt.
///
/// Structural misses (page loaded, expected element absent) are transient:
/// the stage is retried just like a network failure.
#[derive(Debug, Error)]
pub enum StageError {
    /// The underlying request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The search page had no results table.
    #[error("no results table found")]
    NoResultsTable,

    /// No results row matched the identifier with a positive download count.
    #[error("no matching titles found for {identifier}")]
    NoMatchingCandidate {
        /// The identifier searched for.
        identifier: String,
    },

    /// The result page had no English download anchor.
    #[error("no English subtitle link found")]
    NoEnglishLink,

    /// The subtitle payload was empty or too small to be real.
    #[error("subtitle content too small: {len} byte(s), expected at least {min}")]
    ContentTooSmall {
        /// Bytes received.
        len: usize,
        /// Minimum accepted size.
        min: usize,
    },
}

impl StageError {
    /// Retry classification at stage level.
    ///
    /// An exhausted or challenged fetch is worth another stage attempt; only
    /// permanent fetch failures stop the stage.
    #[must_use]
    pub fn failure_type(&self) -> FailureType {
        match self {
            Self::Fetch(error) if error.failure_type() == FailureType::Permanent => {
                FailureType::Permanent
            }
            _ => FailureType::Transient,
        }
    }
}

/// A provider could not produce a subtitle.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A protocol stage ran out of attempts or failed permanently.
    #[error("{provider}: {stage} stage failed after {attempts} attempt(s): {source}")]
    StageFailed {
        /// Provider name.
        provider: String,
        /// The stage that gave up.
        stage: Stage,
        /// Attempts made at that stage.
        attempts: u32,
        /// The final stage error.
        #[source]
        source: StageError,
    },

    /// The provider's HTTP client could not be built.
    #[error("{provider}: HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Provider name.
        provider: String,
        /// Why construction failed.
        reason: String,
    },
}

impl ProviderError {
    /// Creates a `StageFailed` error.
    #[must_use]
    pub fn stage_failed(provider: &str, stage: Stage, attempts: u32, source: StageError) -> Self {
        Self::StageFailed {
            provider: provider.to_string(),
            stage,
            attempts,
            source,
        }
    }

    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(provider: &str, reason: &str) -> Self {
        Self::ClientBuild {
            provider: provider.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from resolving an identifier through the provider chain.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The chain has no providers registered.
    #[error("no providers configured to resolve '{identifier}'\n  Suggestion: {suggestion}")]
    NoProviders {
        /// The identifier being resolved.
        identifier: String,
        /// How to fix the issue.
        suggestion: String,
    },

    /// Every provider was tried and none produced a subtitle.
    #[error(
        "no subtitle found for '{identifier}': tried {tried_count} provider(s)\n  Suggestion: Check the identifier or try again later"
    )]
    AllProvidersFailed {
        /// The identifier being resolved.
        identifier: String,
        /// Number of providers tried.
        tried_count: usize,
    },
}

impl ResolveError {
    /// Creates a `NoProviders` error.
    #[must_use]
    pub fn no_providers(identifier: &str) -> Self {
        Self::NoProviders {
            identifier: identifier.to_string(),
            suggestion: "Add a [[providers]] entry to the config file or remove the empty list"
                .to_string(),
        }
    }

    /// Creates an `AllProvidersFailed` error.
    #[must_use]
    pub fn all_failed(identifier: &str, tried_count: usize) -> Self {
        Self::AllProvidersFailed {
            identifier: identifier.to_string(),
            tried_count,
        }
    }
}
