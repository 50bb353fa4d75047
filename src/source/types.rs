//! Shared result type and fact vocabulary for external sources.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fact keys every adapter translates its source into.
///
/// Source-specific extra detail may ride along under other keys but does
/// not participate in cross-source merging.
pub mod fields {
    pub const CAS_NUMBER: &str = "cas_number";
    pub const FUNCTION: &str = "function";
    pub const SUMMARY: &str = "summary";
    pub const STATUS_OR_CITATION: &str = "status_or_citation";
    pub const ECO_IMPACT: &str = "eco_impact";
}

/// Fields that participate in cross-source merging, in report order.
pub const MERGE_FIELDS: [&str; 5] = [
    fields::CAS_NUMBER,
    fields::FUNCTION,
    fields::SUMMARY,
    fields::STATUS_OR_CITATION,
    fields::ECO_IMPACT,
];

/// What one source had to say about one query.
///
/// Three outcomes stay distinguishable: facts found, clean empty (facts and
/// error both absent), and error. Facts and error are never conflated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceResult {
    pub source_name: String,
    pub query: String,
    #[serde(default)]
    pub facts: IndexMap<String, Value>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceResult {
    /// Empty result for a query against one source.
    pub fn new(source_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            query: query.into(),
            ..Self::default()
        }
    }

    /// Error-only result; facts stay empty.
    pub fn with_error(
        source_name: impl Into<String>,
        query: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(source_name, query);
        result.error = Some(error.into());
        result
    }

    /// Record one fact.
    pub fn add_fact(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.facts.insert(key.into(), value.into());
    }

    /// Append a citation URL unless it is already present.
    ///
    /// Keeps citations ordered and de-duplicated at the source level.
    pub fn cite(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.citations.contains(&url) {
            self.citations.push(url);
        }
    }

    /// Whether any facts were found.
    pub fn has_facts(&self) -> bool {
        !self.facts.is_empty()
    }

    /// Clean query that found nothing: no facts, no error.
    pub fn is_clean_empty(&self) -> bool {
        self.facts.is_empty() && self.error.is_none()
    }
}
