//! Shared HTTP client construction policy for catalog providers.
//!
//! Every provider builds its client here so timeout, user-agent, compression,
//! cookie and proxy behavior stay consistent.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

use super::ProviderError;

/// Default per-request timeout (whole request including body).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Network settings applied to provider HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// Fixed timeout for each request.
    pub request_timeout: Duration,
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            user_agent: user_agent::default_catalog_user_agent(),
        }
    }
}

impl HttpSettings {
    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Builds a provider HTTP client from `settings`.
///
/// `provider_name` is used only for error messages and logging.
///
/// # Errors
///
/// Returns [`ProviderError::ClientBuild`] when client construction fails.
pub fn build_provider_http_client(
    provider_name: &str,
    settings: &HttpSettings,
) -> Result<Client, ProviderError> {
    match try_build_client(settings, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // System proxy lookup panics in some sandboxed environments;
            // env-proxy variables are still honoured by the fallback.
            warn!(
                provider = provider_name,
                "Provider client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(settings, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(ProviderError::client_build(
                    provider_name,
                    "client construction panicked while initializing networking",
                )),
                Err(BuildClientFailure::Build(error)) => Err(ProviderError::client_build(
                    provider_name,
                    &error.to_string(),
                )),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(ProviderError::client_build(
            provider_name,
            &error.to_string(),
        )),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    settings: &HttpSettings,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let settings = settings.clone();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(&settings);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(settings: &HttpSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .user_agent(settings.user_agent.clone())
        .cookie_store(true)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    for (scheme, names) in [
        ("https", ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        ("http", ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
    ] {
        let Some(proxy) = first_env_value(&names) else {
            continue;
        };
        let resolved = if scheme == "https" {
            Proxy::https(&proxy)
        } else {
            Proxy::http(&proxy)
        };
        if let Ok(resolved) = resolved {
            builder = builder.proxy(resolved);
        }
    }
    builder
}

fn first_env_value(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
