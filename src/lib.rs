//! Incidex: ingredient identity resolution and fact aggregation
//!
//! Resolves a free-text ingredient mention to a canonical identity against
//! a curated knowledge base, then assembles a citation-backed fact report
//! by querying several independent, unreliable external sources.
//!
//! # Core Concepts
//!
//! - **Normalization**: one canonical text folding shared by index keys,
//!   match keys, and cache keys
//! - **Matching**: exact-then-fuzzy lookup with an explicit confidence
//!   score (1.0 only for exact hits)
//! - **Aggregation**: per-source adapters that never fail loudly, merged
//!   first-wins by configured trust order, with a full per-source trace
//!
//! # Example
//!
//! ```
//! use incidex::{KnowledgeBase, Matcher};
//! use std::sync::Arc;
//!
//! let json = r#"[{"id": "E1", "name": "Water", "synonyms": ["Aqua"]}]"#;
//! let kb = Arc::new(KnowledgeBase::load_from_reader(json.as_bytes()).unwrap());
//! let matcher = Matcher::new(kb);
//! assert_eq!(matcher.fuzzy_lookup("AQUA").matched_id.as_deref(), Some("E1"));
//! ```

pub mod knowledge;
pub mod normalize;
pub mod report;
pub mod source;

pub use knowledge::{
    IngredientRecord, KnowledgeBase, KnowledgeError, MatchResult, Matcher, SimilarityStrategy,
    TokenSortRatio,
};
pub use normalize::{normalize, split_list};
pub use report::{AggregateReport, Aggregator};
pub use source::{
    cache_key, CosIngSource, EpaScilSource, FactCache, FactSource, FdaFoodAdditiveSource,
    FileCache, MemoryCache, PubChemSource, SourceError, SourceResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
