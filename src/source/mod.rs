//! External knowledge sources and the cache that shields them.
//!
//! # Architecture
//!
//! - **FactSource trait**: one implementation per external source; the
//!   provided `fetch` owns caching, timeouts, and failure capture
//! - **FactCache**: injected cache capability (file-backed or in-memory)
//! - **Adapters**: PubChem (REST endpoint), FDA Food Additive Status List
//!   and EU CosIng (tabular HTML markup), EPA SCIL (downloadable
//!   spreadsheet)
//!
//! Adapters never fail loudly: network trouble, layout drift, and timeouts
//! all degrade to an error-carrying [`SourceResult`] so a report can still
//! be assembled from whichever sources answered.

mod cache;
mod cosing;
mod epa_scil;
mod fda;
mod pubchem;
mod table;
mod traits;
mod types;

pub use cache::{cache_key, FactCache, FileCache, MemoryCache, DEFAULT_MAX_AGE};
pub use cosing::CosIngSource;
pub use epa_scil::EpaScilSource;
pub use fda::FdaFoodAdditiveSource;
pub use pubchem::PubChemSource;
pub use traits::{FactSource, SourceError};
pub use types::{fields, SourceResult, MERGE_FIELDS};

/// A browser-ish User-Agent; some registries reject default client strings.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}
