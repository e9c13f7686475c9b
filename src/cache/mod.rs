//! File-per-key TTL cache.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//! ├── handlers/   # Link handler results
//! ├── api/        # Third-party lookup responses
//! └── robots/     # robots.txt bodies
//!     └── <sha256(key)>.json
//! ```
//!
//! Each file holds `{key, value, created_at, expires_at}`. Expired entries are
//! removed when read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::utils::sha256_hex;

/// Partition of the cache directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Handlers,
    Api,
    Robots,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 3] = [Self::Handlers, Self::Api, Self::Robots];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handlers => "handlers",
            Self::Api => "api",
            Self::Robots => "robots",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    key: String,
    value: T,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Usage numbers for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub categories: Vec<(CacheCategory, CategoryStats)>,
    pub total_files: usize,
    pub total_bytes: u64,
}

/// On-disk JSON cache with per-entry expiry.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    default_ttl: Duration,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self {
            root: root.into(),
            default_ttl,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str, category: CacheCategory) -> PathBuf {
        self.root
            .join(category.as_str())
            .join(format!("{}.json", sha256_hex(key)))
    }

    /// Cached value for `key`, or `None` if missing, expired or unreadable.
    pub async fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        category: CacheCategory,
    ) -> Result<Option<T>> {
        let path = self.path(key, category);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };

        let entry: CacheEntry<T> = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Dropping unreadable cache entry {:?}: {}", path, e);
                remove_if_exists(&path).await?;
                return Ok(None);
            }
        };

        if entry.expires_at <= Utc::now() {
            remove_if_exists(&path).await?;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    /// Store a value with the default TTL.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, category: CacheCategory) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl, category).await
    }

    pub async fn set_with_ttl<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        category: CacheCategory,
    ) -> Result<()> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::validation(format!("cache ttl out of range: {}", e)))?;
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            created_at: now,
            expires_at: now + ttl,
        };
        let bytes = serde_json::to_vec_pretty(&entry)?;
        write_atomic(&self.path(key, category), &bytes).await
    }

    pub async fn delete(&self, key: &str, category: CacheCategory) -> Result<()> {
        remove_if_exists(&self.path(key, category)).await
    }

    /// Remove every entry in `category`, or in all categories when `None`.
    /// Returns the number of files removed.
    pub async fn clear(&self, category: Option<CacheCategory>) -> Result<usize> {
        let categories = match category {
            Some(c) => vec![c],
            None => CacheCategory::ALL.to_vec(),
        };

        let mut removed = 0;
        for category in categories {
            for path in self.entry_files(category).await? {
                remove_if_exists(&path).await?;
                removed += 1;
            }
        }
        log::info!(
            "Cache cleared: {} ({} files)",
            category.map_or("all categories", |c| c.as_str()),
            removed
        );
        Ok(removed)
    }

    /// Delete expired and corrupt entries. Returns the number removed.
    pub async fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        for category in CacheCategory::ALL {
            for path in self.entry_files(category).await? {
                let stale = match tokio::fs::read(&path).await {
                    Ok(bytes) => serde_json::from_slice::<CacheEntry<serde_json::Value>>(&bytes)
                        .map(|entry| entry.expires_at <= now)
                        .unwrap_or(true),
                    Err(_) => true,
                };
                if stale {
                    remove_if_exists(&path).await?;
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            log::info!("Cleaned up {} expired cache entries", removed);
        }
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::default();
        for category in CacheCategory::ALL {
            let mut cat = CategoryStats::default();
            for path in self.entry_files(category).await? {
                if let Ok(meta) = tokio::fs::metadata(&path).await {
                    cat.files += 1;
                    cat.bytes += meta.len();
                }
            }
            stats.total_files += cat.files;
            stats.total_bytes += cat.bytes;
            stats.categories.push((category, cat));
        }
        Ok(stats)
    }

    async fn entry_files(&self, category: CacheCategory) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(category.as_str());
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        Ok(files)
    }
}

/// Write bytes atomically (write to temp, then rename).
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache(dir: &TempDir) -> FileCache {
        FileCache::new(dir.path(), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);

        cache.set("k", &vec![1, 2, 3], CacheCategory::Api).await.unwrap();
        let value: Option<Vec<i32>> = cache.get("k", CacheCategory::Api).await.unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));

        // Categories are separate namespaces
        let other: Option<Vec<i32>> = cache.get("k", CacheCategory::Robots).await.unwrap();
        assert!(other.is_none());

        cache.delete("k", CacheCategory::Api).await.unwrap();
        let gone: Option<Vec<i32>> = cache.get("k", CacheCategory::Api).await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_removed_on_read() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);

        cache
            .set_with_ttl("old", &"v", Duration::ZERO, CacheCategory::Handlers)
            .await
            .unwrap();
        let path = cache.path("old", CacheCategory::Handlers);
        assert!(path.exists());

        let value: Option<String> = cache.get("old", CacheCategory::Handlers).await.unwrap();
        assert!(value.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);

        cache.set("fresh", &1, CacheCategory::Handlers).await.unwrap();
        cache
            .set_with_ttl("stale", &2, Duration::ZERO, CacheCategory::Api)
            .await
            .unwrap();
        std::fs::create_dir_all(dir.path().join("robots")).unwrap();
        std::fs::write(dir.path().join("robots").join("junk.json"), b"{not json").unwrap();

        assert_eq!(cache.cleanup_expired().await.unwrap(), 2);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_files, 1);
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir);

        cache.set("a", &"x", CacheCategory::Handlers).await.unwrap();
        cache.set("b", &"y", CacheCategory::Handlers).await.unwrap();
        cache.set("c", &"z", CacheCategory::Robots).await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_files, 3);
        assert!(stats.total_bytes > 0);

        assert_eq!(cache.clear(Some(CacheCategory::Handlers)).await.unwrap(), 2);
        assert_eq!(cache.stats().await.unwrap().total_files, 1);
        assert_eq!(cache.clear(None).await.unwrap(), 1);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(CacheCategory::parse("robots"), Some(CacheCategory::Robots));
        assert_eq!(CacheCategory::parse("nope"), None);
    }
}
