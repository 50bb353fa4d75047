//! Keyed, TTL'd cache shielding external sources from repeat queries.
//!
//! The cache is an optimization, never a correctness dependency: `get`
//! treats expired or unreadable entries as absent and `put` must not fail
//! the caller. Implementations are injected into adapters at construction
//! so tests can substitute the in-memory variant.

use super::types::SourceResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

/// Default entry lifetime: seven days.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

/// Derive the storage key for one (source, normalized query) pair.
///
/// A fixed-length content hash keeps keys stable, collision-resistant, and
/// safe to use as filenames.
pub fn cache_key(source_name: &str, normalized_query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_name.as_bytes());
    hasher.update(b"::");
    hasher.update(normalized_query.as_bytes());
    hex::encode(hasher.finalize())
}

/// Capability interface for the source cache.
pub trait FactCache: Send + Sync {
    /// Fetch a fresh entry; expired, missing, or corrupted entries are all
    /// reported as absent.
    fn get(&self, key: &str) -> Option<SourceResult>;

    /// Store an entry, best-effort. Persistence failures are absorbed.
    fn put(&self, key: &str, result: &SourceResult);
}

/// On-disk entry envelope. `stored_at` is informational; freshness is
/// judged by file modification time.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    stored_at: DateTime<Utc>,
    payload: SourceResult,
}

/// One JSON file per key under a fixed directory.
///
/// Concurrent readers are safe; concurrent writers to the same key are
/// idempotent because the payload is a deterministic function of the
/// query, so an atomic temp-file rename suffices and no locking is used.
pub struct FileCache {
    dir: PathBuf,
    max_age: Duration,
}

impl FileCache {
    /// Cache under `dir` with the given entry lifetime.
    pub fn new(dir: impl Into<PathBuf>, max_age: Duration) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            debug!(dir = %dir.display(), error = %e, "could not create cache directory");
        }
        Self { dir, max_age }
    }

    /// Cache under the platform data directory (`…/incidex/cache`) with the
    /// default lifetime.
    pub fn with_default_dir() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
        Self::new(base.join("incidex").join("cache"), DEFAULT_MAX_AGE)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(modified) = fs::metadata(path).and_then(|meta| meta.modified()) else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < self.max_age,
            // Modification time in the future: the clock moved under us.
            Err(_) => true,
        }
    }
}

impl FactCache for FileCache {
    fn get(&self, key: &str) -> Option<SourceResult> {
        let path = self.entry_path(key);
        if !self.is_fresh(&path) {
            return None;
        }
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) => Some(entry.payload),
            Err(e) => {
                debug!(key, error = %e, "discarding unreadable cache entry");
                None
            }
        }
    }

    fn put(&self, key: &str, result: &SourceResult) {
        let entry = CacheEntry {
            key: key.to_string(),
            stored_at: Utc::now(),
            payload: result.clone(),
        };
        let Ok(bytes) = serde_json::to_vec_pretty(&entry) else {
            return;
        };
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let outcome = fs::write(&tmp, &bytes).and_then(|()| fs::rename(&tmp, self.entry_path(key)));
        if let Err(e) = outcome {
            debug!(key, error = %e, "cache write failed; continuing without");
        }
    }
}

/// In-memory cache honoring the same TTL contract.
///
/// Used by tests and short-lived embedders that do not want disk state.
pub struct MemoryCache {
    max_age: Duration,
    entries: Mutex<HashMap<String, (Instant, SourceResult)>>,
}

impl MemoryCache {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Entries never expire.
    pub fn unbounded() -> Self {
        Self::new(Duration::MAX)
    }
}

impl FactCache for MemoryCache {
    fn get(&self, key: &str) -> Option<SourceResult> {
        let entries = self.entries.lock().ok()?;
        let (stored_at, payload) = entries.get(key)?;
        if stored_at.elapsed() < self.max_age {
            Some(payload.clone())
        } else {
            None
        }
    }

    fn put(&self, key: &str, result: &SourceResult) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now(), result.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::fields;

    fn sample_result() -> SourceResult {
        let mut result = SourceResult::new("Test", "water");
        result.add_fact(fields::CAS_NUMBER, "7732-18-5");
        result.cite("https://example.test/water");
        result
    }

    #[test]
    fn keys_are_stable_fixed_length_hex() {
        let a = cache_key("PubChem", "water");
        let b = cache_key("PubChem", "water");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, cache_key("EU CosIng", "water"));
        assert_ne!(a, cache_key("PubChem", "glycerin"));
    }

    #[test]
    fn file_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), DEFAULT_MAX_AGE);
        let key = cache_key("Test", "water");

        assert!(cache.get(&key).is_none());
        cache.put(&key, &sample_result());

        let hit = cache.get(&key).expect("entry should be fresh");
        assert_eq!(hit.facts.get(fields::CAS_NUMBER), Some(&"7732-18-5".into()));
        assert_eq!(hit.citations, vec!["https://example.test/water"]);
    }

    #[test]
    fn zero_max_age_expires_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), Duration::ZERO);
        let key = cache_key("Test", "water");

        cache.put(&key, &sample_result());
        assert!(cache.get(&key).is_none(), "expired entry must look absent");
    }

    #[test]
    fn corrupted_entry_is_a_miss_not_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), DEFAULT_MAX_AGE);
        let key = cache_key("Test", "water");

        fs::write(dir.path().join(format!("{key}.json")), b"{ not json").unwrap();
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn put_failure_is_absorbed() {
        // A cache rooted at a path that is a plain file cannot persist
        // anything; puts must still not panic or error.
        let file = tempfile::NamedTempFile::new().unwrap();
        let cache = FileCache::new(file.path(), DEFAULT_MAX_AGE);
        let key = cache_key("Test", "water");
        cache.put(&key, &sample_result());
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn error_results_roundtrip_through_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), DEFAULT_MAX_AGE);
        let key = cache_key("Test", "water");

        cache.put(&key, &SourceResult::with_error("Test", "water", "socket closed"));
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.error.as_deref(), Some("socket closed"));
        assert!(hit.facts.is_empty());
    }

    #[test]
    fn memory_cache_roundtrip_and_expiry() {
        let cache = MemoryCache::unbounded();
        let key = cache_key("Test", "water");
        cache.put(&key, &sample_result());
        assert!(cache.get(&key).is_some());

        let expiring = MemoryCache::new(Duration::ZERO);
        expiring.put(&key, &sample_result());
        assert!(expiring.get(&key).is_none());
    }
}
