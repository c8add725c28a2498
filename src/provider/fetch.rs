//! Safe-fetch: one catalog GET with retry, backoff and challenge detection.
//!
//! Each attempt holds a [`ConcurrencyGate`](crate::resolution::ConcurrencyGate)
//! permit only while the request and body read are in progress; backoff
//! sleeps happen outside the gate.

use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::resolution::ResolutionContext;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::trace::TraceLog;

use super::FetchError;

/// Case-insensitive phrases that mark an interstitial verification page.
pub const CHALLENGE_MARKERS: [&str; 3] = ["just a moment", "cloudflare", "checking your browser"];

/// Body of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Final URL after redirects.
    pub url: String,
    /// Raw response bytes.
    pub bytes: Vec<u8>,
}

impl FetchedBody {
    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Tags whose presence marks a body as an HTML document.
const HTML_MARKERS: [&str; 4] = ["<html", "<!doctype", "<head", "<body"];

/// Returns true if `body` looks like an anti-bot challenge page.
///
/// Only HTML documents are checked, so subtitle text quoting a marker phrase
/// in dialogue is not mistaken for a challenge.
#[must_use]
pub fn looks_like_challenge(body: &[u8]) -> bool {
    if body.is_empty() {
        return false;
    }
    let text = String::from_utf8_lossy(body).to_lowercase();
    if !HTML_MARKERS.iter().any(|tag| text.contains(tag)) {
        return false;
    }
    CHALLENGE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// HTTP client plus the retry policy applied to each request.
#[derive(Debug, Clone)]
pub struct SafeFetcher {
    client: Client,
    policy: RetryPolicy,
    label: String,
}

impl SafeFetcher {
    /// Creates a fetcher; `label` prefixes trace log entries.
    #[must_use]
    pub fn new(client: Client, policy: RetryPolicy, label: impl Into<String>) -> Self {
        Self {
            client,
            policy,
            label: label.into(),
        }
    }

    /// The per-request retry policy.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `url`, retrying transient failures and challenge pages.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] or [`FetchError::GateClosed`]
    /// immediately, and [`FetchError::Exhausted`] once the policy's attempt
    /// budget is used up.
    #[instrument(skip(self, ctx, log), fields(label = %self.label))]
    pub async fn fetch(
        &self,
        url: &str,
        ctx: &ResolutionContext,
        log: &TraceLog,
    ) -> Result<FetchedBody, FetchError> {
        if Url::parse(url).is_err() {
            log.push(format!("[{}] Invalid URL: {url}", self.label));
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let error = match self.fetch_once(url, ctx).await {
                Ok(body) => return Ok(body),
                Err(error) => error,
            };

            match &error {
                FetchError::Challenge { .. } => log.push(format!(
                    "[{}] Challenge page detected (attempt {attempt})",
                    self.label
                )),
                FetchError::HttpStatus { status, .. } => log.push(format!(
                    "[{}] HTTP {status} (attempt {attempt})",
                    self.label
                )),
                other => log.push(format!(
                    "[{}] Request error: {other} (attempt {attempt})",
                    self.label
                )),
            }

            match self.policy.should_retry(error.failure_type(), attempt) {
                RetryDecision::Retry { delay, .. } => {
                    debug!(
                        url,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "retrying catalog request"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(url, attempt, %reason, error = %error, "catalog request failed");
                    log.push(format!("[{}] Request failed after retries", self.label));
                    if matches!(error, FetchError::GateClosed { .. }) {
                        return Err(error);
                    }
                    return Err(FetchError::Exhausted {
                        url: url.to_string(),
                        attempts: attempt,
                        last: error.to_string(),
                    });
                }
            }
        }
    }

    async fn fetch_once(
        &self,
        url: &str,
        ctx: &ResolutionContext,
    ) -> Result<FetchedBody, FetchError> {
        let _permit = ctx
            .gate()
            .acquire()
            .await
            .map_err(|_| FetchError::GateClosed {
                url: url.to_string(),
            })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        // Challenge pages are often served with 403/503, so check the body first.
        if looks_like_challenge(&bytes) {
            return Err(FetchError::Challenge {
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(FetchedBody {
            url: final_url,
            bytes: bytes.to_vec(),
        })
    }
}
