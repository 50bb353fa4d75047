//! Field-merge and citation-union policies.
//!
//! Sources earlier in the scan are ranked by trust, so the merge is
//! first-non-empty-wins: once a field is set it is never overwritten by a
//! lower-priority source. This is deliberately the opposite of the
//! knowledge base's last-registered-wins index policy.

use crate::source::{SourceResult, MERGE_FIELDS};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;

/// True when a fact value carries no information.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

/// First-non-empty-wins merge over the shared fact vocabulary.
pub fn merge_facts(by_source: &[SourceResult]) -> IndexMap<String, Value> {
    let mut merged = IndexMap::new();
    for field in MERGE_FIELDS {
        for result in by_source {
            if let Some(value) = result.facts.get(field) {
                if !is_empty_value(value) {
                    merged.insert(field.to_string(), value.clone());
                    break;
                }
            }
        }
    }
    merged
}

/// Stable citation union: priority order, then source-internal order, with
/// later duplicates dropped so a URL keeps its first-seen position.
pub fn union_citations(by_source: &[SourceResult]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut citations = Vec::new();
    for result in by_source {
        for url in &result.citations {
            if seen.insert(url.clone()) {
                citations.push(url.clone());
            }
        }
    }
    citations
}
