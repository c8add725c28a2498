//! Fake SubtitleCat site for integration tests.
//!
//! [`CatalogResponder`] serves the three pages of the protocol for any
//! identifier:
//! - `/index.php?search=<ID>` returns a results table with one `<ID> English` row
//! - `/subs/<ID>.html` returns a page whose `a#download_en` points at `/subs/<ID>-en.srt`
//! - `/subs/<ID>-en.srt` returns [`subtitle_body`] for `<ID>`

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use subgrab_core::provider::{HttpSettings, ProviderSettings};
use subgrab_core::retry::{Backoff, RetryPolicy};
use wiremock::{Request, Respond, ResponseTemplate};

/// Retry settings with no backoff so failing paths finish quickly.
#[must_use]
pub fn fast_settings() -> ProviderSettings {
    ProviderSettings {
        http: HttpSettings::default().with_request_timeout(Duration::from_secs(5)),
        fetch_policy: RetryPolicy::new(3, Backoff::none()),
        stage_policy: RetryPolicy::new(3, Backoff::none()),
    }
}

/// Same as [`fast_settings`] with explicit attempt ceilings.
#[must_use]
pub fn settings_with_attempts(fetch_attempts: u32, stage_attempts: u32) -> ProviderSettings {
    ProviderSettings {
        http: HttpSettings::default().with_request_timeout(Duration::from_secs(5)),
        fetch_policy: RetryPolicy::new(fetch_attempts, Backoff::none()),
        stage_policy: RetryPolicy::new(stage_attempts, Backoff::none()),
    }
}

/// Results page with `(title, href, downloads)` rows.
#[must_use]
pub fn results_page(rows: &[(&str, &str, u64)]) -> String {
    let body: String = rows
        .iter()
        .map(|(title, href, downloads)| {
            format!(
                "<tr><td><a href=\"{href}\">{title}</a></td><td>English</td><td>{downloads} downloads</td><td>2023-01-01</td></tr>"
            )
        })
        .collect();
    format!(
        "<html><body><table class=\"table sub-table\"><thead><tr><th>Title</th><th>Lang</th><th>Downloads</th><th>Date</th></tr></thead><tbody>{body}</tbody></table></body></html>"
    )
}

/// Subtitle page carrying the English download anchor.
#[must_use]
pub fn subtitle_page(english_href: &str) -> String {
    format!(
        "<html><body><a id=\"download_zh\" href=\"/zh.srt\">Chinese</a><a id=\"download_en\" href=\"{english_href}\">English</a></body></html>"
    )
}

/// SRT content served for `identifier`.
#[must_use]
pub fn subtitle_body(identifier: &str) -> String {
    format!("1\n00:00:01,000 --> 00:00:04,000\nSubtitle for {identifier}\n\n2\n00:00:05,000 --> 00:00:08,000\nThe end\n")
}

/// Serves every page of the catalog protocol for any identifier.
#[derive(Clone, Default)]
pub struct CatalogResponder {
    delay: Duration,
    requests: Arc<AtomicUsize>,
}

impl CatalogResponder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared counter of requests served.
    #[must_use]
    pub fn request_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.requests)
    }
}

impl Respond for CatalogResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let path = request.url.path();

        let body = if path == "/index.php" {
            let identifier = request
                .url
                .query_pairs()
                .find(|(key, _)| key == "search")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            results_page(&[(
                &format!("{identifier} English"),
                &format!("/subs/{identifier}.html"),
                10,
            )])
        } else if let Some(name) = path.strip_prefix("/subs/") {
            if let Some(identifier) = name.strip_suffix("-en.srt") {
                subtitle_body(identifier)
            } else if let Some(identifier) = name.strip_suffix(".html") {
                subtitle_page(&format!("/subs/{identifier}-en.srt"))
            } else {
                return ResponseTemplate::new(404);
            }
        } else {
            return ResponseTemplate::new(404);
        };

        ResponseTemplate::new(200)
            .set_body_string(body)
            .set_delay(self.delay)
    }
}

/// Responds with each template in turn, repeating the last one.
pub struct SequenceResponder {
    responses: Vec<ResponseTemplate>,
    calls: AtomicUsize,
}

impl SequenceResponder {
    #[must_use]
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let index = call.min(self.responses.len().saturating_sub(1));
        self.responses
            .get(index)
            .cloned()
            .unwrap_or_else(|| ResponseTemplate::new(500))
    }
}
