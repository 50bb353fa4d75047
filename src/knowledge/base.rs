//! Knowledge-base loading and name indexing.
//!
//! Records are loaded once from a JSON array and indexed under the
//! normalized form of their canonical name and every synonym. The resulting
//! index is immutable and safely shared by concurrent lookups.

use crate::normalize::normalize;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading the knowledge base.
///
/// These are the only fatal errors in the crate: a malformed or unreadable
/// source aborts startup instead of producing a partial index.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid knowledge base structure: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A curated ingredient record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientRecord {
    /// Stable opaque identifier, unique within the knowledge base.
    pub id: String,
    /// Canonical display name.
    pub name: String,
    /// Alternate names, author casing preserved.
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Fields the curated source carries beyond the core schema.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Loads ingredient records once and serves an immutable name→id index.
///
/// Colliding normalized keys resolve last-registered-wins. That is an
/// intentional policy, and the opposite of the aggregator's first-wins
/// field merge.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    by_id: IndexMap<String, IngredientRecord>,
    name_index: IndexMap<String, String>,
}

impl KnowledgeBase {
    /// Load from a JSON file holding an array of records.
    ///
    /// No partial load: any structural problem fails the whole call.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KnowledgeError> {
        let file = File::open(path)?;
        Self::load_from_reader(BufReader::new(file))
    }

    /// Load from any reader producing the same JSON shape.
    pub fn load_from_reader(reader: impl Read) -> Result<Self, KnowledgeError> {
        let records: Vec<IngredientRecord> = serde_json::from_reader(reader)?;
        let mut kb = Self::default();
        for record in records {
            kb.index_record(record);
        }
        Ok(kb)
    }

    fn index_record(&mut self, record: IngredientRecord) {
        // Canonical name first, then synonyms, in author order. Keys that
        // normalize to nothing are not indexable.
        for raw in std::iter::once(&record.name).chain(record.synonyms.iter()) {
            let key = normalize(raw);
            if !key.is_empty() {
                self.name_index.insert(key, record.id.clone());
            }
        }
        self.by_id.insert(record.id.clone(), record);
    }

    /// Retrieve a record by its id.
    pub fn get(&self, id: &str) -> Option<&IngredientRecord> {
        self.by_id.get(id)
    }

    /// Resolve an already-normalized key to a record id.
    pub fn resolve(&self, normalized: &str) -> Option<&str> {
        self.name_index.get(normalized).map(String::as_str)
    }

    /// Indexed normalized names, in insertion order.
    ///
    /// Insertion order is what makes the fuzzy tie-break deterministic.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.name_index.keys().map(String::as_str)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the base holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"[
        {"id": "E1", "name": "Water", "synonyms": ["Aqua", "Eau"]},
        {"id": "E2", "name": "Glycerin", "synonyms": ["Glycerol"], "origin": "plant"}
    ]"#;

    #[test]
    fn loads_and_indexes_names_and_synonyms() {
        let kb = KnowledgeBase::load_from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(kb.len(), 2);
        assert_eq!(kb.resolve("water"), Some("E1"));
        assert_eq!(kb.resolve("aqua"), Some("E1"));
        assert_eq!(kb.resolve("eau"), Some("E1"));
        assert_eq!(kb.resolve("glycerol"), Some("E2"));
        assert_eq!(kb.get("E1").unwrap().name, "Water");
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let kb = KnowledgeBase::load(file.path()).unwrap();
        assert_eq!(kb.resolve("aqua"), Some("E1"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let err = KnowledgeBase::load("/nonexistent/ingredients.json").unwrap_err();
        assert!(matches!(err, KnowledgeError::Io(_)));
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = KnowledgeBase::load_from_reader(&b"{not json"[..]).unwrap_err();
        assert!(matches!(err, KnowledgeError::Decode(_)));
    }

    #[test]
    fn structurally_wrong_shape_is_fatal() {
        // An object where an array of records is required.
        let err =
            KnowledgeBase::load_from_reader(&br#"{"id": "E1", "name": "Water"}"#[..]).unwrap_err();
        assert!(matches!(err, KnowledgeError::Decode(_)));
    }

    #[test]
    fn colliding_keys_resolve_last_registered_wins() {
        let json = r#"[
            {"id": "E1", "name": "Fragrance", "synonyms": ["Parfum"]},
            {"id": "E2", "name": "Parfum", "synonyms": []}
        ]"#;
        let kb = KnowledgeBase::load_from_reader(json.as_bytes()).unwrap();
        assert_eq!(kb.resolve("parfum"), Some("E2"));
        assert_eq!(kb.resolve("fragrance"), Some("E1"));
    }

    #[test]
    fn synonyms_default_to_empty() {
        let json = r#"[{"id": "E1", "name": "Water"}]"#;
        let kb = KnowledgeBase::load_from_reader(json.as_bytes()).unwrap();
        assert!(kb.get("E1").unwrap().synonyms.is_empty());
    }

    #[test]
    fn extra_fields_pass_through() {
        let kb = KnowledgeBase::load_from_reader(SAMPLE.as_bytes()).unwrap();
        let glycerin = kb.get("E2").unwrap();
        assert_eq!(
            glycerin.extra.get("origin"),
            Some(&serde_json::json!("plant"))
        );
    }

    #[test]
    fn unindexable_names_are_skipped() {
        let json = r#"[{"id": "E1", "name": "Water", "synonyms": ["???"]}]"#;
        let kb = KnowledgeBase::load_from_reader(json.as_bytes()).unwrap();
        assert_eq!(kb.names().count(), 1);
        assert_eq!(kb.resolve(""), None);
    }
}
