//! PubChem adapter, backed by the official PUG REST endpoint.
//!
//! Three round-trips per uncached query: name→CID, CID→description,
//! CID→synonyms. The CAS registry number is recovered heuristically from
//! the synonym list, which is where PubChem actually carries it.

use super::cache::FactCache;
use super::traits::{FactSource, SourceError};
use super::types::{fields, SourceResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const PUG_BASE: &str = "https://pubchem.ncbi.nlm.nih.gov/rest/pug";
const COMPOUND_BASE: &str = "https://pubchem.ncbi.nlm.nih.gov/compound";

/// PubChem descriptions can run long; keep summaries bounded.
const SUMMARY_MAX_CHARS: usize = 800;
/// PubChem lists thousands of synonyms for common compounds.
const SYNONYM_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
struct CidResponse {
    #[serde(rename = "IdentifierList", default)]
    identifier_list: Option<IdentifierList>,
}

#[derive(Debug, Deserialize)]
struct IdentifierList {
    #[serde(rename = "CID", default)]
    cid: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct InformationResponse {
    #[serde(rename = "InformationList", default)]
    information_list: Option<InformationList>,
}

#[derive(Debug, Deserialize)]
struct InformationList {
    #[serde(rename = "Information", default)]
    information: Vec<Information>,
}

#[derive(Debug, Default, Deserialize)]
struct Information {
    #[serde(rename = "Description", default)]
    description: Option<String>,
    #[serde(rename = "Synonym", default)]
    synonym: Vec<String>,
}

pub struct PubChemSource {
    client: reqwest::Client,
    cache: Arc<dyn FactCache>,
}

impl PubChemSource {
    pub fn new(cache: Arc<dyn FactCache>) -> Self {
        Self {
            client: super::http_client(),
            cache,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: reqwest::Url,
        timeout: Duration,
    ) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

/// Build a PUG REST URL from path segments, percent-encoding each one.
fn pug_url(segments: &[&str]) -> Result<reqwest::Url, SourceError> {
    let mut url = reqwest::Url::parse(PUG_BASE)
        .map_err(|e| SourceError::Parse(format!("bad PUG base url: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| SourceError::Parse("PUG base url cannot be a base".into()))?
        .extend(segments);
    Ok(url)
}

/// First synonym shaped like a CAS registry number: exactly two hyphens,
/// digits everywhere else.
fn find_cas(synonyms: &[String]) -> Option<&str> {
    synonyms
        .iter()
        .map(String::as_str)
        .find(|s| {
            let digits: String = s.chars().filter(|c| *c != '-').collect();
            s.matches('-').count() == 2
                && !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_digit())
        })
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[async_trait]
impl FactSource for PubChemSource {
    fn name(&self) -> &str {
        "PubChem"
    }

    fn base_reference(&self) -> &str {
        "https://pubchem.ncbi.nlm.nih.gov"
    }

    fn cache(&self) -> &dyn FactCache {
        self.cache.as_ref()
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(8)
    }

    async fn fetch_live(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<SourceResult, SourceError> {
        let mut out = SourceResult::new(self.name(), query);

        let cid_url = pug_url(&["compound", "name", query, "cids", "JSON"])?;
        let response = self.client.get(cid_url).timeout(timeout).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // PubChem answers 404 for unknown names: a clean empty result.
            return Ok(out);
        }
        let cids: CidResponse = response.error_for_status()?.json().await?;
        let Some(cid) = cids
            .identifier_list
            .map(|list| list.cid)
            .and_then(|cids| cids.into_iter().next())
        else {
            return Ok(out);
        };

        let cid_segment = cid.to_string();

        // Description and synonyms are best-effort: a partial answer still
        // beats none.
        let description_url = pug_url(&["compound", "cid", &cid_segment, "description", "JSON"])?;
        if let Ok(info) = self
            .get_json::<InformationResponse>(description_url, timeout)
            .await
        {
            let description = info
                .information_list
                .into_iter()
                .flat_map(|list| list.information)
                .find_map(|entry| entry.description);
            if let Some(description) = description {
                out.add_fact(
                    fields::SUMMARY,
                    truncate_chars(&description, SUMMARY_MAX_CHARS),
                );
            }
        }

        let synonyms_url = pug_url(&["compound", "cid", &cid_segment, "synonyms", "JSON"])?;
        if let Ok(info) = self
            .get_json::<InformationResponse>(synonyms_url, timeout)
            .await
        {
            let synonyms: Vec<String> = info
                .information_list
                .into_iter()
                .flat_map(|list| list.information)
                .flat_map(|entry| entry.synonym)
                .take(SYNONYM_LIMIT)
                .collect();
            if !synonyms.is_empty() {
                out.add_fact("synonyms", synonyms.clone());
                if let Some(cas) = find_cas(&synonyms) {
                    out.add_fact(fields::CAS_NUMBER, cas);
                }
            }
        }

        out.cite(format!("{COMPOUND_BASE}/{cid}"));
        Ok(out)
    }
}
