//! The polymorphic source-adapter contract.
//!
//! One implementation per external source; adding a source means adding an
//! implementation, never branching inside the aggregator. The provided
//! [`FactSource::fetch`] owns the cross-cutting contract so each adapter
//! only implements its own fetch-and-parse path.

use super::cache::{cache_key, FactCache};
use super::types::SourceResult;
use crate::normalize::normalize;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures internal to one adapter's fetch-and-parse path.
///
/// These never cross the adapter boundary: [`FactSource::fetch`] folds them
/// into `SourceResult::error`.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// One external knowledge source.
///
/// Implementations translate a source-specific representation (REST
/// endpoint, tabular markup, downloadable spreadsheet) into the shared
/// fact vocabulary of [`super::types::fields`].
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Stable label used in reports and cache keys.
    fn name(&self) -> &str;

    /// Landing URL for the source, cited even when nothing is found.
    fn base_reference(&self) -> &str;

    /// The injected cache shared with the other adapters.
    fn cache(&self) -> &dyn FactCache;

    /// Per-source timeout floor, applied when the caller does not override.
    fn default_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }

    /// Fetch and parse from the live source. May fail; `fetch` degrades
    /// every failure into the returned result.
    async fn fetch_live(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<SourceResult, SourceError>;

    /// Resolve one query against this source, never failing loudly.
    ///
    /// Consults the cache first: a fresh hit bypasses the external call
    /// entirely, whether it holds facts, an empty result, or a captured
    /// error; only TTL expiry triggers a re-fetch. Every outcome is
    /// written back through the cache so retries stay cheap and idempotent,
    /// and the base reference URL is always among the citations.
    async fn fetch(&self, query: &str, timeout: Option<Duration>) -> SourceResult {
        let timeout = timeout.unwrap_or_else(|| self.default_timeout());
        let key = cache_key(self.name(), &normalize(query));

        if let Some(hit) = self.cache().get(&key) {
            debug!(source = self.name(), query, "cache hit");
            return hit;
        }

        let mut result = match tokio::time::timeout(timeout, self.fetch_live(query, timeout)).await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(source = self.name(), query, error = %e, "source fetch failed");
                SourceResult::with_error(self.name(), query, e.to_string())
            }
            Err(_) => {
                warn!(source = self.name(), query, ?timeout, "source fetch timed out");
                SourceResult::with_error(
                    self.name(),
                    query,
                    SourceError::TimedOut(timeout).to_string(),
                )
            }
        };

        result.cite(self.base_reference());
        self.cache().put(&key, &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::cache::MemoryCache;
    use crate::source::types::fields;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scriptable source used to exercise the provided `fetch` contract.
    struct StubSource {
        cache: Arc<dyn FactCache>,
        live_calls: AtomicUsize,
        behavior: Behavior,
    }

    enum Behavior {
        Facts,
        Empty,
        Fail,
        Hang,
    }

    impl StubSource {
        fn new(cache: Arc<dyn FactCache>, behavior: Behavior) -> Self {
            Self {
                cache,
                live_calls: AtomicUsize::new(0),
                behavior,
            }
        }

        fn calls(&self) -> usize {
            self.live_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FactSource for StubSource {
        fn name(&self) -> &str {
            "Stub"
        }

        fn base_reference(&self) -> &str {
            "https://stub.example"
        }

        fn cache(&self) -> &dyn FactCache {
            self.cache.as_ref()
        }

        fn default_timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn fetch_live(
            &self,
            query: &str,
            _timeout: Duration,
        ) -> Result<SourceResult, SourceError> {
            self.live_calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Facts => {
                    let mut result = SourceResult::new(self.name(), query);
                    result.add_fact(fields::CAS_NUMBER, "64-17-5");
                    result.cite("https://stub.example/record/1");
                    Ok(result)
                }
                Behavior::Empty => Ok(SourceResult::new(self.name(), query)),
                Behavior::Fail => Err(SourceError::Parse("layout changed".into())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(SourceResult::new(self.name(), query))
                }
            }
        }
    }

    #[tokio::test]
    async fn failure_is_captured_never_raised() {
        let source = StubSource::new(Arc::new(MemoryCache::unbounded()), Behavior::Fail);
        let result = source.fetch("ethanol", None).await;
        assert_eq!(result.error.as_deref(), Some("parse error: layout changed"));
        assert!(result.facts.is_empty());
    }

    #[tokio::test]
    async fn base_reference_is_always_cited() {
        for behavior in [Behavior::Facts, Behavior::Empty, Behavior::Fail] {
            let source = StubSource::new(Arc::new(MemoryCache::unbounded()), behavior);
            let result = source.fetch("ethanol", None).await;
            assert!(
                result.citations.iter().any(|c| c == "https://stub.example"),
                "missing base citation in {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn fresh_cache_hit_bypasses_the_live_call() {
        let source = StubSource::new(Arc::new(MemoryCache::unbounded()), Behavior::Facts);
        let first = source.fetch("ethanol", None).await;
        let second = source.fetch("ethanol", None).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(first.facts, second.facts);
        assert_eq!(first.citations, second.citations);
    }

    #[tokio::test]
    async fn error_outcomes_are_cached_too() {
        let source = StubSource::new(Arc::new(MemoryCache::unbounded()), Behavior::Fail);
        let first = source.fetch("ethanol", None).await;
        let second = source.fetch("ethanol", None).await;

        assert_eq!(source.calls(), 1);
        assert_eq!(first.error, second.error);
    }

    #[tokio::test]
    async fn expired_entries_force_a_refetch() {
        let source = StubSource::new(
            Arc::new(MemoryCache::new(Duration::ZERO)),
            Behavior::Facts,
        );
        source.fetch("ethanol", None).await;
        source.fetch("ethanol", None).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn hung_fetch_hits_the_per_call_timeout() {
        let source = StubSource::new(Arc::new(MemoryCache::unbounded()), Behavior::Hang);
        let result = source
            .fetch("ethanol", Some(Duration::from_millis(10)))
            .await;
        let error = result.error.expect("timeout must be captured");
        assert!(error.contains("timed out"), "got: {error}");
    }

    #[tokio::test]
    async fn caller_timeout_overrides_the_source_default() {
        let source = StubSource::new(Arc::new(MemoryCache::unbounded()), Behavior::Hang);
        // Default is 50ms; the override below keeps the test fast anyway.
        let start = std::time::Instant::now();
        source.fetch("ethanol", Some(Duration::from_millis(5))).await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn cache_keys_are_shared_per_normalized_query() {
        let cache: Arc<dyn FactCache> = Arc::new(MemoryCache::unbounded());
        let source = StubSource::new(Arc::clone(&cache), Behavior::Facts);
        source.fetch("Ethanol", None).await;
        // Different surface form, same normalized query: still a cache hit.
        source.fetch("  ethanol ", None).await;
        assert_eq!(source.calls(), 1);
    }
}
