//! Ingredient identity: curated records, name indexing, and matching.
//!
//! # Architecture
//!
//! - **KnowledgeBase**: one-shot JSON load into an immutable, insertion-
//!   ordered normalized-name→id index (canonical names and synonyms alike)
//! - **Matcher**: exact-then-fuzzy lookup with a confidence score
//! - **SimilarityStrategy**: pluggable fuzzy scoring; exact-only operation
//!   is an explicit matcher mode, not a runtime branch
//!
//! # Example
//!
//! ```
//! use incidex::knowledge::{KnowledgeBase, Matcher};
//! use std::sync::Arc;
//!
//! let json = r#"[{"id": "E1", "name": "Water", "synonyms": ["Aqua"]}]"#;
//! let kb = Arc::new(KnowledgeBase::load_from_reader(json.as_bytes()).unwrap());
//! let matcher = Matcher::new(kb);
//!
//! let hit = matcher.fuzzy_lookup("aqua");
//! assert_eq!(hit.matched_name.as_deref(), Some("Water"));
//! assert_eq!(hit.confidence, 1.0);
//! ```

mod base;
mod matcher;
mod similarity;

pub use base::{IngredientRecord, KnowledgeBase, KnowledgeError};
pub use matcher::{MatchResult, Matcher};
pub use similarity::{SimilarityStrategy, TokenSortRatio};
