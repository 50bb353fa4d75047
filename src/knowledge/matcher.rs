//! Exact-then-fuzzy resolution of tokens against the knowledge base.
//!
//! Exact lookup runs first, both because an exact normalized-key hit is
//! authoritative (a fuzzy candidate must never override it) and because it
//! is cheap. The fuzzy pass scans every indexed name in insertion order, so
//! score ties resolve to the first-inserted candidate.

use crate::knowledge::similarity::{SimilarityStrategy, TokenSortRatio};
use crate::knowledge::KnowledgeBase;
use crate::normalize::{normalize, split_list};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of resolving one token.
///
/// `confidence` is 1.0 only for an exact normalized-key hit and 0.0 exactly
/// when no record matched.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub input_text: String,
    pub normalized: String,
    pub matched_id: Option<String>,
    pub matched_name: Option<String>,
    pub confidence: f64,
}

impl MatchResult {
    fn miss(input_text: String, normalized: String) -> Self {
        Self {
            input_text,
            normalized,
            matched_id: None,
            matched_name: None,
            confidence: 0.0,
        }
    }
}

/// Resolves free-text tokens to knowledge-base entries.
pub struct Matcher {
    kb: Arc<KnowledgeBase>,
    similarity: Option<Box<dyn SimilarityStrategy>>,
}

impl Matcher {
    /// Matcher with the default fuzzy strategy.
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self::with_strategy(kb, Box::new(TokenSortRatio))
    }

    /// Matcher with an explicit similarity strategy.
    pub fn with_strategy(kb: Arc<KnowledgeBase>, strategy: Box<dyn SimilarityStrategy>) -> Self {
        Self {
            kb,
            similarity: Some(strategy),
        }
    }

    /// Exact-match-only mode: without a strategy the fuzzy pass is skipped
    /// deterministically and misses report confidence 0.0.
    pub fn exact_only(kb: Arc<KnowledgeBase>) -> Self {
        Self {
            kb,
            similarity: None,
        }
    }

    /// Resolve one token to the best knowledge-base entry.
    pub fn fuzzy_lookup(&self, token: &str) -> MatchResult {
        let norm = normalize(token);

        if let Some(id) = self.kb.resolve(&norm) {
            let id = id.to_string();
            // Report the record's canonical name, not the synonym that hit.
            let matched_name = self
                .kb
                .get(&id)
                .map(|record| record.name.clone())
                .unwrap_or_else(|| norm.clone());
            return MatchResult {
                input_text: token.to_string(),
                normalized: norm,
                matched_id: Some(id),
                matched_name: Some(matched_name),
                confidence: 1.0,
            };
        }

        if let Some(strategy) = &self.similarity {
            let mut best: Option<(&str, f64)> = None;
            for candidate in self.kb.names() {
                let score = strategy.score(&norm, candidate);
                // Strictly-greater keeps the first maximal candidate in
                // index insertion order.
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((candidate, score));
                }
            }

            if let Some((key, score)) = best {
                if score > 0.0 {
                    let matched_id = self.kb.resolve(key).map(str::to_string);
                    let matched_name = matched_id
                        .as_deref()
                        .and_then(|id| self.kb.get(id))
                        .map(|record| record.name.clone())
                        .or_else(|| Some(key.to_string()));
                    return MatchResult {
                        input_text: token.to_string(),
                        normalized: norm,
                        matched_id,
                        matched_name,
                        confidence: score / 100.0,
                    };
                }
            }
        }

        MatchResult::miss(token.to_string(), norm)
    }

    /// Tokenize a combined ingredient-list string and resolve each piece.
    pub fn match_list(&self, text: &str) -> Vec<MatchResult> {
        split_list(text)
            .iter()
            .map(|token| self.fuzzy_lookup(token))
            .collect()
    }
}
