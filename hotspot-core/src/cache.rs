//! Versioned, TTL-bounded memoization of `Aggregator` output, keyed by repo
//! state so a cache hit is only ever reused for bit-identical inputs.
//!
//! Global invariants enforced:
//! - Writes are best-effort; `PersistenceStore::set` failures are swallowed
//!   (`CachePersistenceError` -> treated as miss on read, no-op on write).
//! - A miss, a schema-version mismatch, a stale entry (`now - created_at > 7
//!   days`), or a deserialization failure are all treated identically: compute
//!   fresh and (best-effort) store the result.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::aggregator::{self, AggregateOutput};
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::git::GitClient;
use crate::types::Config;

/// Bumped on breaking semantic changes to `AggregateOutput`'s shape.
pub const CACHE_SCHEMA_VERSION: i32 = 1;

/// Entries older than this are treated as a miss even if otherwise valid.
pub const CACHE_TTL: Duration = Duration::days(7);

/// Capability consumed by `AggregateCache`. The core assumes no durability
/// guarantees beyond what the caller's implementation provides; a get/set
/// failure is always equivalent to "not cached".
pub trait PersistenceStore: Send + Sync {
    /// An `Err` means "no usable entry" (miss), not necessarily corruption.
    fn get(&self, key: &str) -> anyhow::Result<(Vec<u8>, i32, i64)>;
    /// Failures here are swallowed by the caller; implementations need not
    /// retry.
    fn set(&self, key: &str, bytes: &[u8], schema_version: i32, created_at_unix: i64) -> anyhow::Result<()>;
}

/// Truncate to hour granularity so repeated runs within the same hour share a
/// cache key regardless of wall-clock jitter.
fn truncate_to_hour(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H").to_string()
}

pub fn cache_key(
    repo_path: &str,
    mode: &str,
    lookback: Duration,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    repo_head_hash: &str,
) -> String {
    let start_hour = start.map(truncate_to_hour).unwrap_or_default();
    let end_hour = end.map(truncate_to_hour).unwrap_or_default();
    let raw = format!(
        "{repo_path}:{mode}:{}:{start_hour}:{end_hour}:{repo_head_hash}",
        lookback.num_seconds()
    );
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct AggregateCache<'a> {
    store: &'a dyn PersistenceStore,
}

impl<'a> AggregateCache<'a> {
    pub fn new(store: &'a dyn PersistenceStore) -> Self {
        Self { store }
    }

    /// Return the cached `AggregateOutput` for `config`'s window if a fresh,
    /// schema-matching entry exists; otherwise compute via `Aggregator` and
    /// write back best-effort.
    pub fn get_or_compute(
        &self,
        git: &dyn GitClient,
        config: &Config,
        now: DateTime<Utc>,
        token: &CancellationToken,
    ) -> Result<AggregateOutput> {
        let repo_head_hash = git.get_repo_hash(&config.repo_path, token).unwrap_or_default();
        let key = cache_key(
            &config.repo_path.display().to_string(),
            config.mode.as_str(),
            config.lookback,
            config.start_time,
            config.end_time,
            &repo_head_hash,
        );

        if let Some(hit) = self.try_read(&key, now) {
            return Ok(hit);
        }

        let computed = aggregator::aggregate(git, config, token)?;
        self.try_write(&key, &computed, now);
        Ok(computed)
    }

    fn try_read(&self, key: &str, now: DateTime<Utc>) -> Option<AggregateOutput> {
        let (bytes, schema_version, created_at) = self.store.get(key).ok()?;
        if schema_version != CACHE_SCHEMA_VERSION {
            return None;
        }
        let created_at = DateTime::<Utc>::from_timestamp(created_at, 0)?;
        if now - created_at > CACHE_TTL {
            return None;
        }
        serde_json::from_slice(&bytes).ok()
    }

    fn try_write(&self, key: &str, output: &AggregateOutput, now: DateTime<Utc>) {
        let Ok(bytes) = serde_json::to_vec(output) else {
            return;
        };
        if let Err(e) = self
            .store
            .set(key, &bytes, CACHE_SCHEMA_VERSION, now.timestamp())
        {
            eprintln!("warning: failed to persist aggregate cache entry: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct MemStore {
        entries: RefCell<HashMap<String, (Vec<u8>, i32, i64)>>,
    }

    impl MemStore {
        fn new() -> Self {
            Self {
                entries: RefCell::new(HashMap::new()),
            }
        }
    }

    impl PersistenceStore for MemStore {
        fn get(&self, key: &str) -> anyhow::Result<(Vec<u8>, i32, i64)> {
            self.entries
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("miss"))
        }

        fn set(&self, key: &str, bytes: &[u8], schema_version: i32, created_at_unix: i64) -> anyhow::Result<()> {
            self.entries
                .borrow_mut()
                .insert(key.to_string(), (bytes.to_vec(), schema_version, created_at_unix));
            Ok(())
        }
    }

    #[test]
    fn key_changes_with_repo_head_hash() {
        let k1 = cache_key("/repo", "hot", Duration::days(30), None, None, "sha1");
        let k2 = cache_key("/repo", "hot", Duration::days(30), None, None, "sha2");
        assert_ne!(k1, k2);
    }

    #[test]
    fn key_stable_within_same_hour() {
        let t1 = DateTime::parse_from_rfc3339("2024-01-01T10:05:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        let t2 = DateTime::parse_from_rfc3339("2024-01-01T10:55:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        let k1 = cache_key("/repo", "hot", Duration::days(30), Some(t1), None, "sha");
        let k2 = cache_key("/repo", "hot", Duration::days(30), Some(t2), None, "sha");
        assert_eq!(k1, k2);
    }

    #[test]
    fn stale_entry_is_treated_as_miss() {
        let store = MemStore::new();
        let cache = AggregateCache::new(&store);
        let now = Utc::now();
        let stale_created_at = (now - Duration::days(8)).timestamp();
        let out = AggregateOutput::default();
        let bytes = serde_json::to_vec(&out).unwrap();
        store
            .set("k", &bytes, CACHE_SCHEMA_VERSION, stale_created_at)
            .unwrap();
        assert!(cache.try_read("k", now).is_none());
    }

    #[test]
    fn mismatched_schema_version_is_treated_as_miss() {
        let store = MemStore::new();
        let cache = AggregateCache::new(&store);
        let now = Utc::now();
        let out = AggregateOutput::default();
        let bytes = serde_json::to_vec(&out).unwrap();
        store.set("k", &bytes, CACHE_SCHEMA_VERSION + 1, now.timestamp()).unwrap();
        assert!(cache.try_read("k", now).is_none());
    }

    #[test]
    fn fresh_valid_entry_hits() {
        let store = MemStore::new();
        let cache = AggregateCache::new(&store);
        let now = Utc::now();
        let mut out = AggregateOutput::default();
        out.commit_count.insert("a.rs".to_string(), 5);
        let bytes = serde_json::to_vec(&out).unwrap();
        store.set("k", &bytes, CACHE_SCHEMA_VERSION, now.timestamp()).unwrap();
        let hit = cache.try_read("k", now).unwrap();
        assert_eq!(hit.commits_for("a.rs"), 5);
    }
}
