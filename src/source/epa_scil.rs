//! EPA Safer Chemical Ingredients List adapter.
//!
//! The SCIL ships as a downloadable spreadsheet linked from a landing page
//! that moves the file around between revisions. We discover the current
//! link first and keep a pinned fallback URL. Rows are matched on an
//! aggressively folded name (alphanumerics only) because the sheet mixes
//! salts, registry punctuation, and inconsistent spacing.

use super::cache::FactCache;
use super::traits::{FactSource, SourceError};
use super::types::{fields, SourceResult};
use crate::knowledge::{SimilarityStrategy, TokenSortRatio};
use crate::normalize::normalize;
use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Reader};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SCIL_PAGE: &str = "https://www.epa.gov/saferchoice/safer-ingredients";
const XLS_FALLBACK: &str =
    "https://www.epa.gov/sites/default/files/2015-09/safer_chemical_ingredients_list.xls";

/// Minimum similarity for the last-resort fuzzy row match.
const FUZZY_THRESHOLD: f64 = 85.0;

pub struct EpaScilSource {
    client: reqwest::Client,
    cache: Arc<dyn FactCache>,
}

impl EpaScilSource {
    pub fn new(cache: Arc<dyn FactCache>) -> Self {
        Self {
            client: super::http_client(),
            cache,
        }
    }

    /// Find the current spreadsheet link on the landing page, if any.
    async fn discover_sheet_url(&self, timeout: Duration) -> Option<String> {
        let html = self
            .client
            .get(SCIL_PAGE)
            .timeout(timeout)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .text()
            .await
            .ok()?;
        find_sheet_link(&html)
    }

    async fn load_rows(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<Vec<String>>, SourceError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;

        if url.to_ascii_lowercase().ends_with(".csv") {
            parse_csv(&response.text().await?)
        } else {
            parse_workbook(&response.bytes().await?)
        }
    }
}

/// First absolute URL in the page pointing at a spreadsheet download.
fn find_sheet_link(html: &str) -> Option<String> {
    for (start, _) in html.match_indices("https://") {
        let tail = &html[start..];
        let end = tail
            .find(|c: char| c == '"' || c == '\'' || c == '<' || c == '>' || c.is_whitespace())
            .unwrap_or(tail.len());
        let url = &tail[..end];
        let lower = url.to_ascii_lowercase();
        if lower.ends_with(".xls") || lower.ends_with(".xlsx") || lower.ends_with(".csv") {
            return Some(url.to_string());
        }
    }
    None
}

/// Fold a name down to lowercase alphanumerics for row matching.
fn fold(s: &str) -> String {
    normalize(s)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// The sheet buries its header somewhere in the first rows; find the first
/// row that names the list or chemical column.
fn detect_header(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter().take(15).position(|row| {
        let joined = row.join(" ").to_lowercase();
        joined.contains("list name") || joined.contains("chemical name")
    })
}

fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Parse(format!("bad csv: {e}")))?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    if rows.is_empty() {
        return Err(SourceError::Parse("empty csv".into()));
    }
    Ok(rows)
}

fn parse_workbook(bytes: &[u8]) -> Result<Vec<Vec<String>>, SourceError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SourceError::Parse(format!("unreadable workbook: {e}")))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut fallback: Option<Vec<Vec<String>>> = None;

    for name in &sheet_names {
        let Ok(range) = workbook.worksheet_range(name) else {
            continue;
        };
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
            .collect();
        if rows.is_empty() {
            continue;
        }
        if detect_header(&rows).is_some() {
            return Ok(rows);
        }
        if fallback.is_none() {
            fallback = Some(rows);
        }
    }

    fallback.ok_or_else(|| SourceError::Parse("workbook has no usable sheets".into()))
}

/// Split raw rows into headers and body at the detected header row.
fn table_from_rows(mut rows: Vec<Vec<String>>) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    if rows.is_empty() {
        return None;
    }
    let header_idx = detect_header(&rows).unwrap_or(0);
    let body = rows.split_off(header_idx + 1);
    let headers = rows.pop()?;
    Some((headers, body))
}

fn name_column(headers: &[String]) -> usize {
    headers
        .iter()
        .position(|header| {
            let folded = fold(header);
            folded.contains("listname") || folded.contains("chemicalname")
        })
        .unwrap_or(0)
}

/// Exact folded equality first, then containment, then a fuzzy pass.
fn find_hit<'a>(
    body: &'a [Vec<String>],
    name_col: usize,
    target: &str,
) -> Option<&'a Vec<String>> {
    if target.is_empty() {
        return None;
    }

    let cell = |row: &[String]| row.get(name_col).map(|c| fold(c));

    if let Some(row) = body.iter().find(|row| cell(row).as_deref() == Some(target)) {
        return Some(row);
    }
    if let Some(row) = body
        .iter()
        .find(|row| cell(row).is_some_and(|c| c.contains(target)))
    {
        return Some(row);
    }
    body.iter()
        .find(|row| cell(row).is_some_and(|c| TokenSortRatio.score(&c, target) > FUZZY_THRESHOLD))
}

#[async_trait]
impl FactSource for EpaScilSource {
    fn name(&self) -> &str {
        "EPA SCIL"
    }

    fn base_reference(&self) -> &str {
        SCIL_PAGE
    }

    fn cache(&self) -> &dyn FactCache {
        self.cache.as_ref()
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    async fn fetch_live(
        &self,
        query: &str,
        timeout: Duration,
    ) -> Result<SourceResult, SourceError> {
        let mut out = SourceResult::new(self.name(), query);
        out.cite(SCIL_PAGE);

        let mut urls = Vec::new();
        if let Some(discovered) = self.discover_sheet_url(timeout).await {
            debug!(source = self.name(), url = %discovered, "discovered sheet link");
            urls.push(discovered);
        }
        urls.push(XLS_FALLBACK.to_string());

        let mut rows = None;
        let mut last_error: Option<SourceError> = None;
        for url in &urls {
            match self.load_rows(url, timeout).await {
                Ok(loaded) => {
                    out.cite(url.clone());
                    rows = Some(loaded);
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }

        let Some(all_rows) = rows else {
            let reason = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".into());
            out.error = Some(format!("failed to load SCIL: {reason}"));
            return Ok(out);
        };
        let Some((headers, body)) = table_from_rows(all_rows) else {
            out.error = Some("failed to load SCIL: empty table".into());
            return Ok(out);
        };

        let name_col = name_column(&headers);
        let Some(row) = find_hit(&body, name_col, &fold(query)) else {
            out.error = Some("ingredient not found in SCIL".into());
            return Ok(out);
        };

        let column = |pred: &dyn Fn(&str) -> bool| {
            headers
                .iter()
                .position(|h| pred(&fold(h)))
                .and_then(|idx| row.get(idx))
                .filter(|v| !v.is_empty())
        };

        if let Some(value) = row.get(name_col).filter(|v| !v.is_empty()) {
            out.add_fact("epa_name", value.clone());
        }
        if let Some(value) = column(&|h| h.contains("cas")) {
            out.add_fact(fields::CAS_NUMBER, value.clone());
        }
        if let Some(value) = column(&|h| h.contains("tsca")) {
            out.add_fact("tsca_name", value.clone());
        }
        if let Some(value) = column(&|h| h.contains("listcall")) {
            out.add_fact("list_call", value.clone());
            // The list call (green circle, yellow triangle, …) is the
            // sheet's environmental verdict.
            out.add_fact(fields::ECO_IMPACT, value.clone());
        }
        if let Some(value) = column(&|h| h.contains("caveat")) {
            out.add_fact("caveat", value.clone());
        }
        if let Some(value) = column(&|h| h.contains("editdescription")) {
            out.add_fact("edit_description", value.clone());
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_FIXTURE: &str = "\
Safer Chemical Ingredients List,,,\n\
generated 2015,,,\n\
List Name,CAS Number,TSCA Chemical Name,List Call,Caveat - Chemical Use\n\
Sodium lauryl sulfoacetate,1847-58-1,\"Acetic acid, 2-sulfo-, 1-dodecyl ester, sodium salt\",Green circle,\n\
Lauramine oxide,1643-20-5,\"1-Dodecanamine, N,N-dimethyl-, N-oxide\",Green circle,Surfactant only\n";

    #[test]
    fn discovers_spreadsheet_links() {
        let html = r#"
            <a href="https://www.epa.gov/page">About</a>
            <a href="https://www.epa.gov/files/scil_2024.XLSX">Download</a>
        "#;
        assert_eq!(
            find_sheet_link(html).as_deref(),
            Some("https://www.epa.gov/files/scil_2024.XLSX")
        );
        assert_eq!(find_sheet_link("<p>no links</p>"), None);
    }

    #[test]
    fn fold_strips_everything_but_alphanumerics() {
        assert_eq!(fold("Acetic acid, 2-sulfo-"), "aceticacid2sulfo");
        assert_eq!(fold("  Sodium Lauryl  Sulfoacetate "), "sodiumlaurylsulfoacetate");
    }

    #[test]
    fn header_row_is_detected_below_preamble() {
        let rows = parse_csv(CSV_FIXTURE).unwrap();
        assert_eq!(detect_header(&rows), Some(2));

        let (headers, body) = table_from_rows(rows).unwrap();
        assert_eq!(headers[0], "List Name");
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn exact_and_containment_matches() {
        let rows = parse_csv(CSV_FIXTURE).unwrap();
        let (headers, body) = table_from_rows(rows).unwrap();
        let name_col = name_column(&headers);
        assert_eq!(name_col, 0);

        let exact = find_hit(&body, name_col, &fold("Sodium lauryl sulfoacetate")).unwrap();
        assert_eq!(exact[1], "1847-58-1");

        let contains = find_hit(&body, name_col, &fold("lauramine")).unwrap();
        assert_eq!(contains[1], "1643-20-5");
    }

    #[test]
    fn fuzzy_pass_catches_near_misses() {
        let rows = parse_csv(CSV_FIXTURE).unwrap();
        let (headers, body) = table_from_rows(rows).unwrap();
        let hit = find_hit(&body, name_column(&headers), &fold("lauramine oxides")).unwrap();
        assert_eq!(hit[1], "1643-20-5");
    }

    #[test]
    fn unknown_names_miss() {
        let rows = parse_csv(CSV_FIXTURE).unwrap();
        let (headers, body) = table_from_rows(rows).unwrap();
        assert!(find_hit(&body, name_column(&headers), &fold("plutonium")).is_none());
        assert!(find_hit(&body, name_column(&headers), "").is_none());
    }

    #[test]
    fn empty_csv_is_a_parse_error() {
        assert!(parse_csv("").is_err());
    }
}
