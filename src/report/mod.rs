//! Multi-source fact aggregation.
//!
//! The aggregator fans one query out across the configured sources and
//! folds the answers into a single [`AggregateReport`]: merged facts
//! (first-non-empty-wins by source priority), a de-duplicated citation
//! union, and the full per-source trace for trust assessment.
//!
//! # Example
//!
//! ```no_run
//! use incidex::report::Aggregator;
//! use incidex::source::FileCache;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let cache = Arc::new(FileCache::with_default_dir());
//! let aggregator = Aggregator::default_stack(cache);
//! let report = aggregator.aggregate("glycerin").await;
//! println!("{}", serde_json::to_string_pretty(&report).unwrap());
//! # }
//! ```

mod aggregator;
mod merge;

pub use aggregator::{AggregateReport, Aggregator};
pub use merge::{merge_facts, union_citations};
