//! FDA Food Additive Status List adapter.
//!
//! The list is published as HTML tables whose layout changes without
//! notice. The scrape is defensive: if no table matches, the result is a
//! clean empty one, never a hard failure.

use super::cache::FactCache;
use super::table::{self, Table};
use super::traits::{FactSource, SourceError};
use super::types::{fields, SourceResult};
use crate::normalize::normalize;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const FDA_URL: &str =
    "https://www.fda.gov/food/food-additives-petitions/food-additive-status-list";

pub struct FdaFoodAdditiveSource {
    client: reqwest::Client,
    cache: Arc<dyn FactCache>,
}

impl FdaFoodAdditiveSource {
    pub fn new(cache: Arc<dyn FactCache>) -> Self {
        Self {
            client: super::http_client(),
            cache,
        }
    }
}

/// Scan every table for a row mentioning the query in a likely name
/// column, and lift that row's status fields.
fn extract_facts(html: &str, query_norm: &str) -> Option<IndexMap<String, Value>> {
    if query_norm.is_empty() {
        return None;
    }

    for table in table::parse_tables(html) {
        if let Some(facts) = extract_from_table(&table, query_norm) {
            return Some(facts);
        }
    }
    None
}

fn extract_from_table(table: &Table, query_norm: &str) -> Option<IndexMap<String, Value>> {
    // Columns whose header mentions "name" or "additive" are tried first;
    // a headerless table falls back to its first column.
    let mut name_columns: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, header)| {
            let header = header.to_lowercase();
            header.contains("name") || header.contains("additive")
        })
        .map(|(idx, _)| idx)
        .collect();
    if name_columns.is_empty() {
        name_columns.push(0);
    }

    let category_col = table.find_column(|h| h.contains("category"));
    let status_col = table.find_column(|h| h.contains("21 cfr") || h.contains("citation"));

    for column in name_columns {
        for row in &table.rows {
            let Some(cell) = row.get(column) else { continue };
            if !normalize(cell).contains(query_norm) {
                continue;
            }

            let mut facts = IndexMap::new();
            facts.insert("listed_name".to_string(), Value::from(cell.clone()));
            if let Some(category) = category_col.and_then(|idx| row.get(idx)) {
                if !category.is_empty() {
                    facts.insert("category".to_string(), Value::from(category.clone()));
                }
            }
            if let Some(status) = status_col.and_then(|idx| row.get(idx)) {
                if !status.is_empty() {
                    facts.insert(
                        fields::STATUS_OR_CITATION.to_string(),
                        Value::from(status.clone()),
                    );
                }
            }
            return Some(facts);
        }
    }
    None
}

#[async_trait]
impl FactSource for FdaFoodAdditiveSource {
    fn name(&self) -> &str {
        "FDA Food Additive Status List"
    }

    fn base_reference(&self) -> &str {
        FDA_URL
    }

    fn cache(&self) -> &dyn FactCache {
        self.cache.as_ref()
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(12)
    }

    async fn fetch_live(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<SourceResult, SourceError> {
        let html = self
            .client
            .get(FDA_URL)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut out = SourceResult::new(self.name(), query);
        out.cite(FDA_URL);
        if let Some(facts) = extract_facts(&html, &normalize(query)) {
            out.facts = facts;
        }
        Ok(out)
    }
}
