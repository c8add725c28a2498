//! Provider chain with priority-ordered, first-success resolution.
//!
//! The [`ProviderChain`] owns the configured providers and tries them one
//! after another until one returns a subtitle.

use tracing::{debug, info, warn};

use crate::resolution::ResolutionContext;
use crate::trace::TraceLog;

use super::{Provider, ResolveError, SubtitleResult};

/// A priority-ordered collection of providers.
///
/// Providers are tried Primary first, then Secondary, then Fallback. Within
/// the same priority level, registration order is preserved.
pub struct ProviderChain {
    providers: Vec<Box<dyn Provider>>,
}

impl ProviderChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registers a provider, keeping the chain sorted by priority.
    #[tracing::instrument(skip(self, provider), fields(provider_name))]
    pub fn register(&mut self, provider: Box<dyn Provider>) {
        tracing::Span::current().record("provider_name", provider.name());
        debug!(
            name = provider.name(),
            priority = ?provider.priority(),
            "Registering provider"
        );
        self.providers.push(provider);
        // sort_by_key is stable, so equal priorities keep registration order
        self.providers.sort_by_key(|p| p.priority());
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in the order they will be tried.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Resolves `identifier` by trying each provider in order.
    ///
    /// Stops at the first provider that returns a subtitle. Each attempt and
    /// its outcome are appended to `log`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NoProviders` if the chain is empty.
    /// Returns `ResolveError::AllProvidersFailed` if every provider fails.
    #[tracing::instrument(skip(self, ctx, log), fields(identifier = %identifier))]
    pub async fn resolve(
        &self,
        identifier: &str,
        ctx: &ResolutionContext,
        log: &TraceLog,
    ) -> Result<SubtitleResult, ResolveError> {
        if self.providers.is_empty() {
            log.push(format!("[chain] No providers configured for {identifier}"));
            return Err(ResolveError::no_providers(identifier));
        }

        let mut tried_count: usize = 0;
        for provider in &self.providers {
            tried_count += 1;
            log.push(format!("[chain] Trying provider {}", provider.name()));

            match provider.resolve(identifier, ctx, log).await {
                Ok(result) => {
                    log.push(format!("[chain] {} succeeded", provider.name()));
                    info!(
                        provider = provider.name(),
                        source_url = %result.source_url,
                        "Resolution successful"
                    );
                    return Ok(result);
                }
                Err(error) => {
                    log.push(format!(
                        "[chain] {} found nothing, falling through: {error}",
                        provider.name()
                    ));
                    debug!(
                        provider = provider.name(),
                        error = %error,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        log.push(format!("[chain] No provider succeeded for {identifier}"));
        warn!(identifier, tried_count, "All providers failed");
        Err(ResolveError::all_failed(identifier, tried_count))
    }
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.provider_names())
            .finish()
    }
}
