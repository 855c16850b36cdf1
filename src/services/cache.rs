//! Summary cache backends.
//!
//! Caches Wikipedia page summaries keyed by the outbound lookup URL so
//! repeat requests for the same landmark skip the network. Entries expire
//! after a fixed window; expired entries read as misses. Concurrent writers
//! for the same key race benignly (last write wins).

use crate::services::wikipedia::PageSummary;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[async_trait]
pub trait SummaryCache: Send + Sync {
    /// Look up a summary. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<PageSummary>, anyhow::Error>;

    /// Store a summary, stamping it with the current time.
    async fn put(&self, key: &str, summary: &PageSummary) -> Result<(), anyhow::Error>;
}

/// A summary plus the time it was stored, as persisted by the backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedSummary {
    summary: PageSummary,
    stored_at: DateTime<Utc>,
}

impl CachedSummary {
    fn new(summary: &PageSummary) -> Self {
        Self {
            summary: summary.clone(),
            stored_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl_secs: i64) -> bool {
        Utc::now() - self.stored_at >= Duration::seconds(ttl_secs)
    }
}

/// File-backed cache: one JSON file per key under a base directory.
/// Survives process restarts.
pub struct FileSummaryCache {
    base_path: PathBuf,
    ttl_secs: i64,
}

impl FileSummaryCache {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        ttl_secs: i64,
    ) -> Result<Self, anyhow::Error> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            ttl_secs,
        })
    }

    /// Keys are URLs, so they are encoded into a filesystem-safe name.
    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(key)))
    }
}

#[async_trait]
impl SummaryCache for FileSummaryCache {
    async fn get(&self, key: &str) -> Result<Option<PageSummary>, anyhow::Error> {
        let path = self.entry_path(key);

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CachedSummary = serde_json::from_slice(&raw)?;

        if entry.is_expired(self.ttl_secs) {
            // Best-effort cleanup; a racing writer may already have
            // replaced the file.
            let _ = fs::remove_file(&path).await;
            return Ok(None);
        }

        Ok(Some(entry.summary))
    }

    async fn put(&self, key: &str, summary: &PageSummary) -> Result<(), anyhow::Error> {
        let path = self.entry_path(key);
        let raw = serde_json::to_vec(&CachedSummary::new(summary))?;
        fs::write(path, raw).await?;
        Ok(())
    }
}

/// In-memory cache for single-process use.
pub struct InMemorySummaryCache {
    entries: DashMap<String, CachedSummary>,
    ttl_secs: i64,
}

impl InMemorySummaryCache {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_secs,
        }
    }
}

#[async_trait]
impl SummaryCache for InMemorySummaryCache {
    async fn get(&self, key: &str) -> Result<Option<PageSummary>, anyhow::Error> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(self.ttl_secs) {
                return Ok(Some(entry.summary.clone()));
            }
        }
        // Drop the expired entry outside the read guard.
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(self.ttl_secs));
        Ok(None)
    }

    async fn put(&self, key: &str, summary: &PageSummary) -> Result<(), anyhow::Error> {
        self.entries
            .insert(key.to_string(), CachedSummary::new(summary));
        Ok(())
    }
}

/// Disabled cache: every lookup misses, nothing is stored.
pub struct NoopSummaryCache;

#[async_trait]
impl SummaryCache for NoopSummaryCache {
    async fn get(&self, _key: &str) -> Result<Option<PageSummary>, anyhow::Error> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _summary: &PageSummary) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> PageSummary {
        PageSummary {
            summary: "A wrought-iron lattice tower in Paris.".to_string(),
            page: "https://en.wikipedia.org/wiki/Eiffel_Tower".to_string(),
        }
    }

    const KEY: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/Eiffel%20Tower";

    #[tokio::test]
    async fn test_file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileSummaryCache::new(dir.path(), 3600).await.unwrap();

        assert!(cache.get(KEY).await.unwrap().is_none());
        cache.put(KEY, &summary()).await.unwrap();
        assert_eq!(cache.get(KEY).await.unwrap(), Some(summary()));
    }

    #[tokio::test]
    async fn test_file_cache_expires_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileSummaryCache::new(dir.path(), 0).await.unwrap();

        cache.put(KEY, &summary()).await.unwrap();
        assert!(cache.get(KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let cache = FileSummaryCache::new(dir.path(), 3600).await.unwrap();
            cache.put(KEY, &summary()).await.unwrap();
        }

        let reopened = FileSummaryCache::new(dir.path(), 3600).await.unwrap();
        assert_eq!(reopened.get(KEY).await.unwrap(), Some(summary()));
    }

    #[tokio::test]
    async fn test_file_cache_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileSummaryCache::new(dir.path(), 3600).await.unwrap();

        cache.put(KEY, &summary()).await.unwrap();
        let replacement = PageSummary {
            summary: "Updated text.".to_string(),
            page: String::new(),
        };
        cache.put(KEY, &replacement).await.unwrap();

        assert_eq!(cache.get(KEY).await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip_and_expiry() {
        let cache = InMemorySummaryCache::new(3600);
        cache.put(KEY, &summary()).await.unwrap();
        assert_eq!(cache.get(KEY).await.unwrap(), Some(summary()));

        let expiring = InMemorySummaryCache::new(0);
        expiring.put(KEY, &summary()).await.unwrap();
        assert!(expiring.get(KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_cache_never_stores() {
        let cache = NoopSummaryCache;
        cache.put(KEY, &summary()).await.unwrap();
        assert!(cache.get(KEY).await.unwrap().is_none());
    }
}
