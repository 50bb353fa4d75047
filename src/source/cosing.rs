//! EU CosIng adapter (cosmetic ingredient database).
//!
//! CosIng publishes tabular markup whose layout shifts periodically. Only
//! tables that look like ingredient listings (headers mentioning INCI,
//! function, or name) are considered; anything else degrades to an empty
//! result.

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

const COSING_URL: &str = "https://ec.europa.eu/growth/tools-databases/cosing/";

pub struct CosIngSource {
    client: reqwest::Client,
    cache: Arc<dyn FactCache>,
}

impl CosIngSource {
    pub fn new(cache: Arc<dyn FactCache>) -> Self {
        Self {
            client: super::http_client(),
            cache,
        }
    }
}

fn looks_like_ingredient_table(table: &Table) -> bool {
    table.headers.iter().any(|header| {
        let header = header.to_lowercase();
        header.contains("inci") || header.contains("function") || header.contains("name")
    })
}

/// Find the first row, in any candidate table, where some cell equals or
/// contains the normalized query, and lift its INCI name and function.
fn extract_facts(html: &str, query_norm: &str) -> Option<IndexMap<String, Value>> {
    if query_norm.is_empty() {
        return None;
    }

    for table in table::parse_tables(html) {
        if !looks_like_ingredient_table(&table) {
            continue;
        }

        let inci_col = table.find_column(|h| h.contains("inci"));
        let function_col = table.find_column(|h| h.contains("function"));

        for row in &table.rows {
            let hit = row.iter().any(|cell| {
                let cell = normalize(cell);
                cell == query_norm || cell.contains(query_norm)
            });
            if !hit {
                continue;
            }

            let mut facts = IndexMap::new();
            if let Some(inci) = inci_col.and_then(|idx| row.get(idx)) {
                if !inci.is_empty() {
                    facts.insert("inci_name".to_string(), Value::from(inci.clone()));
                }
            }
            if let Some(function) = function_col.and_then(|idx| row.get(idx)) {
                if !function.is_empty() {
                    facts.insert(fields::FUNCTION.to_string(), Value::from(function.clone()));
                }
            }
            if facts.is_empty() {
                continue;
            }
            return Some(facts);
        }
    }
    None
}

#[async_trait]
impl FactSource for CosIngSource {
    fn name(&self) -> &str {
        "EU CosIng"
    }

    fn base_reference(&self) -> &str {
        COSING_URL
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
            .get(COSING_URL)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut out = SourceResult::new(self.name(), query);
        out.cite(COSING_URL);
        if let Some(facts) = extract_facts(&html, &normalize(query)) {
            out.facts = facts;
        }
        Ok(out)
    }
}
