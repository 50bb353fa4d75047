//! Fan-out across configured sources and report assembly.
//!
//! Sources are registered in priority order (most trusted first); that
//! order drives field-merge precedence and the citation union. Adapters
//! run concurrently, so end-to-end latency is bounded by the slowest
//! single source rather than their sum.

use super::merge;
use crate::source::{
    CosIngSource, FactCache, FactSource, FdaFoodAdditiveSource, PubChemSource, SourceResult,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Merged, citation-backed answer for one query.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub query: String,
    pub merged_facts: IndexMap<String, Value>,
    /// One entry per configured source, in invocation order, present even
    /// when a source failed, so "found nothing" and "failed" stay separate.
    pub by_source: Vec<SourceResult>,
    pub citations: Vec<String>,
}

/// Orchestrates the configured source adapters.
pub struct Aggregator {
    sources: Vec<Arc<dyn FactSource>>,
    timeout: Option<Duration>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    /// Aggregator with no sources; register them in priority order.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            timeout: None,
        }
    }

    /// Aggregator over the given sources, already in priority order.
    pub fn with_sources(sources: Vec<Arc<dyn FactSource>>) -> Self {
        Self {
            sources,
            timeout: None,
        }
    }

    /// The production stack: PubChem, then the FDA status list, then EU
    /// CosIng, all sharing one cache. EPA SCIL is opt-in via [`register`]
    /// (its upstream has a history of instability).
    ///
    /// [`register`]: Aggregator::register
    pub fn default_stack(cache: Arc<dyn FactCache>) -> Self {
        Self::with_sources(vec![
            Arc::new(PubChemSource::new(Arc::clone(&cache))),
            Arc::new(FdaFoodAdditiveSource::new(Arc::clone(&cache))),
            Arc::new(CosIngSource::new(cache)),
        ])
    }

    /// Append a source at the lowest priority.
    pub fn register(&mut self, source: Arc<dyn FactSource>) {
        self.sources.push(source);
    }

    /// Override every source's default timeout for this aggregator.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Configured source names, in priority order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// Query every configured source and merge the answers.
    ///
    /// Never fails: a source that errors (or whose task dies) contributes
    /// an error-only entry to `by_source` and nothing to the merge.
    pub async fn aggregate(&self, name: &str) -> AggregateReport {
        // Launch everything up front, then collect in registration order
        // so by_source and merge precedence stay deterministic.
        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let query = name.to_string();
                let timeout = self.timeout;
                tokio::spawn(async move { source.fetch(&query, timeout).await })
            })
            .collect();

        let mut by_source = Vec::with_capacity(handles.len());
        for (handle, source) in handles.into_iter().zip(&self.sources) {
            match handle.await {
                Ok(result) => by_source.push(result),
                Err(e) => {
                    warn!(source = source.name(), error = %e, "source task died");
                    by_source.push(SourceResult::with_error(
                        source.name(),
                        name,
                        format!("source task died: {e}"),
                    ));
                }
            }
        }

        AggregateReport {
            query: name.to_string(),
            merged_facts: merge::merge_facts(&by_source),
            citations: merge::union_citations(&by_source),
            by_source,
        }
    }
}
