//! Per-identifier memo of successful subtitle resolutions.
//!
//! Only successes are stored. A failed lookup leaves no entry, so the next
//! request for the same identifier runs the full protocol again. Entries live
//! as long as the cache; there is no eviction or expiry.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::identifier::normalized_key;
use crate::provider::SubtitleResult;

/// Concurrent identifier → result map.
///
/// Keys are compared case-insensitively. Two tasks missing on the same
/// identifier at once may both resolve it; the later insert replaces the
/// earlier one with equivalent content.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: DashMap<String, SubtitleResult>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ResolutionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `identifier`, if any.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<SubtitleResult> {
        self.entries
            .get(&normalized_key(identifier))
            .map(|entry| entry.value().clone())
    }

    /// Returns the cached result or runs `resolver` and caches its success.
    ///
    /// The map lock is not held while `resolver` runs.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error unchanged; nothing is cached for it.
    pub async fn get_or_resolve<F, Fut, E>(
        &self,
        identifier: &str,
        resolver: F,
    ) -> Result<SubtitleResult, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SubtitleResult, E>>,
    {
        let key = normalized_key(identifier);

        if let Some(hit) = self.entries.get(&key).map(|entry| entry.value().clone()) {
            self.hits.fetch_add(1, Ordering::SeqCst);
            debug!(identifier = %key, "resolution cache hit");
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::SeqCst);
        debug!(identifier = %key, "resolution cache miss");

        let result = resolver().await?;
        self.entries.insert(key, result.clone());
        Ok(result)
    }

    /// Number of cached identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the cache.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Lookups that had to invoke the resolver.
    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn sample_result(content: &str) -> SubtitleResult {
        SubtitleResult::new(
            content.as_bytes().to_vec(),
            "https://catalog.test/sub.srt",
            "subtitlecat",
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_resolver() {
        let cache = ResolutionCache::new();
        let calls = AtomicUsize::new(0);

        let first: Result<_, ()> = cache
            .get_or_resolve("ABW-255", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_result("one"))
            })
            .await;
        let second: Result<_, ()> = cache
            .get_or_resolve("abw-255", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_result("two"))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_does_not_store_failures() {
        let cache = ResolutionCache::new();

        let failed: Result<SubtitleResult, &str> = cache
            .get_or_resolve("ABW-255", || async { Err("not found") })
            .await;
        assert!(failed.is_err());
        assert!(cache.is_empty());
        assert!(cache.get("ABW-255").is_none());

        let retried: Result<_, &str> = cache
            .get_or_resolve("ABW-255", || async { Ok(sample_result("found")) })
            .await;
        assert_eq!(retried.unwrap().content, b"found");
        assert_eq!(cache.misses(), 2);
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_overwrite_hit() {
        let cache = ResolutionCache::new();
        let _: Result<_, ()> = cache
            .get_or_resolve("ABW-255", || async { Ok(sample_result("kept")) })
            .await;

        let again: Result<_, &str> = cache
            .get_or_resolve("ABW-255", || async { Err("should not run") })
            .await;
        assert_eq!(again.unwrap().content, b"kept");
        assert_eq!(cache.get("abw-255").unwrap().content, b"kept");
    }
}
