//! Shared state for subtitle resolution.
//!
//! A [`ResolutionContext`] owns the [`ResolutionCache`] and the
//! [`ConcurrencyGate`] and is passed explicitly into every resolution call.
//! One context per process run gives cross-file cache reuse; tests build
//! their own to stay isolated.
//!
//! # Example
//!
//! ```no_run
//! use subgrab_core::provider::build_default_provider_chain;
//! use subgrab_core::resolution::{ResolutionContext, resolve_cached};
//! use subgrab_core::trace::TraceLog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let chain = build_default_provider_chain(&Default::default());
//! let ctx = ResolutionContext::default();
//! let log = TraceLog::new();
//!
//! let subtitle = resolve_cached("ABW-255", &chain, &ctx, &log).await?;
//! println!("{} bytes from {}", subtitle.content.len(), subtitle.source_url);
//! # Ok(())
//! # }
//! ```

mod cache;
mod gate;

pub use cache::ResolutionCache;
pub use gate::{ConcurrencyGate, DEFAULT_GATE_CAPACITY, GateClosed, GatePermit};

use tracing::instrument;

use crate::provider::{ProviderChain, ResolveError, SubtitleResult};
use crate::trace::TraceLog;

/// Cache plus admission gate shared by all resolutions in a run.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    cache: ResolutionCache,
    gate: ConcurrencyGate,
}

impl ResolutionContext {
    /// Creates a context whose gate admits `gate_capacity` requests at once.
    #[must_use]
    pub fn new(gate_capacity: usize) -> Self {
        Self {
            cache: ResolutionCache::new(),
            gate: ConcurrencyGate::new(gate_capacity),
        }
    }

    /// The result cache.
    #[must_use]
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// The outbound request gate.
    #[must_use]
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }
}

/// Resolves `identifier` through the cache, falling back to `chain` on a miss.
///
/// A cache hit performs no network access and adds one trace entry.
///
/// # Errors
///
/// Returns the chain's [`ResolveError`] when no provider produced a subtitle.
#[instrument(skip(chain, ctx, log), fields(identifier = %identifier))]
pub async fn resolve_cached(
    identifier: &str,
    chain: &ProviderChain,
    ctx: &ResolutionContext,
    log: &TraceLog,
) -> Result<SubtitleResult, ResolveError> {
    if let Some(hit) = ctx.cache().get(identifier) {
        log.push(format!(
            "[cache] {identifier} already resolved by {} ({})",
            hit.provider, hit.source_url
        ));
    }
    ctx.cache()
        .get_or_resolve(identifier, || chain.resolve(identifier, ctx, log))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_default_gate_capacity() {
        let ctx = ResolutionContext::default();
        assert_eq!(ctx.gate().capacity(), DEFAULT_GATE_CAPACITY);
        assert!(ctx.cache().is_empty());
    }

    #[test]
    fn test_context_custom_gate_capacity() {
        let ctx = ResolutionContext::new(7);
        assert_eq!(ctx.gate().capacity(), 7);
    }
}
