//! Keeps parsed transaction files in memory so repeated requests for the same file do not reparse
//! it. An entry is reused for as long as the file's fingerprint is unchanged.
//!
//! Length and modification time are trusted only for a file whose modification time is older than
//! the read by at least `MTIME_GRANULARITY`. Some filesystems store coarse times, so a file that
//! was rewritten shortly after it was read can keep its old time. Such a file is hashed on every
//! request until it settles.

use crate::model::{TimestampParser, Transactions};
use crate::{load, utils, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// The coarsest modification time resolution in common use (FAT).
const MTIME_GRANULARITY: Duration = Duration::from_secs(2);

/// Identifies the content of a file that was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
    digest: String,
    /// When the content was read.
    taken: SystemTime,
}

impl Fingerprint {
    fn new(len: u64, modified: Option<SystemTime>, bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self {
            len,
            modified,
            digest: format!("{:x}", hasher.finalize()),
            taken: SystemTime::now(),
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// The hex SHA-256 digest of the file content.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// An unknown or unsettled modification time never matches, so the content has to be hashed.
    fn same_metadata(&self, len: u64, modified: Option<SystemTime>) -> bool {
        let Some(modified) = modified else {
            return false;
        };
        let settled = modified
            .checked_add(MTIME_GRANULARITY)
            .is_some_and(|t| t < self.taken);
        settled && self.len == len && self.modified == Some(modified)
    }
}

/// How `DatasetCache::get` produced its result.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Length and modification time were unchanged.
    Hit,
    /// The metadata changed but the content hashed the same.
    Revalidated,
    /// The file was parsed.
    Loaded,
}

serde_plain::derive_display_from_serialize!(CacheStatus);

#[derive(Debug)]
struct Entry {
    fingerprint: Fingerprint,
    transactions: Arc<Transactions>,
}

/// Parsed transaction files keyed by canonical path.
///
/// The timestamp formats are fixed when the cache is created. Loading with different formats
/// requires a different cache.
#[derive(Debug, Default)]
pub struct DatasetCache {
    timestamps: TimestampParser,
    entries: HashMap<PathBuf, Entry>,
}

impl DatasetCache {
    pub fn new(timestamps: TimestampParser) -> Self {
        Self {
            timestamps,
            entries: HashMap::new(),
        }
    }

    pub fn timestamps(&self) -> &TimestampParser {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The fingerprint of the cached entry for `path`, which must already be canonical.
    pub fn fingerprint(&self, path: &Path) -> Option<&Fingerprint> {
        self.entries.get(path).map(|e| &e.fingerprint)
    }

    /// Returns the transactions in the file at `path`, loading it if it is not cached or has
    /// changed.
    ///
    /// # Errors
    /// - Returns an error if the file does not exist or cannot be read or parsed. A failed load
    ///   leaves any existing entry for the path in place.
    pub async fn get(&mut self, path: &Path) -> Result<(Arc<Transactions>, CacheStatus)> {
        let path = utils::canonicalize(path).await?;
        let metadata = utils::metadata(&path).await?;
        let modified = metadata.modified().ok();

        if let Some(entry) = self.entries.get(&path) {
            if entry.fingerprint.same_metadata(metadata.len(), modified) {
                debug!("Cache hit for {}", path.display());
                return Ok((entry.transactions.clone(), CacheStatus::Hit));
            }
        }

        let bytes = utils::read_bytes(&path).await?;
        let fingerprint = Fingerprint::new(bytes.len() as u64, modified, &bytes);

        if let Some(entry) = self.entries.get_mut(&path) {
            if entry.fingerprint.digest == fingerprint.digest {
                debug!(
                    "The metadata of {} changed but its content did not",
                    path.display()
                );
                entry.fingerprint = fingerprint;
                return Ok((entry.transactions.clone(), CacheStatus::Revalidated));
            }
        }

        let transactions = load::parse(&bytes, &self.timestamps)
            .with_context(|| format!("Unable to parse {}", path.display()))?;
        let transactions = Arc::new(transactions);
        info!(
            "Loaded {} records from {}",
            transactions.len(),
            path.display()
        );
        self.entries.insert(
            path,
            Entry {
                fingerprint,
                transactions: transactions.clone(),
            },
        );
        Ok((transactions, CacheStatus::Loaded))
    }

    /// Drops the entry for `path`. Returns whether there was one.
    pub async fn invalidate(&mut self, path: &Path) -> bool {
        // A deleted file can no longer be canonicalized, so fall back to the path as given.
        let key = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        let removed = self.entries.remove(&key).is_some();
        debug!("Invalidated {} (cached: {removed})", key.display());
        removed
    }

    /// Drops every entry. Returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        debug!("Cleared {count} cached file(s)");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CSV: &str = "Region,Credit\nEast,1\nWest,2\n";

    fn touch(path: &Path, modified: SystemTime) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    fn an_hour_ago() -> SystemTime {
        SystemTime::now() - Duration::from_secs(3600)
    }

    #[tokio::test]
    async fn test_hit_returns_same_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, CSV).unwrap();
        touch(&path, an_hour_ago());

        let mut cache = DatasetCache::default();
        let (first, status) = cache.get(&path).await.unwrap();
        assert_eq!(status, CacheStatus::Loaded);
        assert_eq!(first.len(), 2);

        let (second, status) = cache.get(&path).await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_touched_file_is_revalidated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, CSV).unwrap();

        let mut cache = DatasetCache::default();
        let (first, _) = cache.get(&path).await.unwrap();
        let before = cache
            .fingerprint(&path.canonicalize().unwrap())
            .unwrap()
            .clone();

        touch(&path, an_hour_ago());
        let (second, status) = cache.get(&path).await.unwrap();
        assert_eq!(status, CacheStatus::Revalidated);
        assert!(Arc::ptr_eq(&first, &second));

        let after = cache.fingerprint(&path.canonicalize().unwrap()).unwrap();
        assert_eq!(before.digest(), after.digest());
        assert_ne!(before.modified(), after.modified());

        let (_, status) = cache.get(&path).await.unwrap();
        assert_eq!(status, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn test_recently_modified_file_is_hashed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, CSV).unwrap();

        let mut cache = DatasetCache::default();
        cache.get(&path).await.unwrap();
        let (_, status) = cache.get(&path).await.unwrap();
        assert_eq!(status, CacheStatus::Revalidated);
    }

    #[tokio::test]
    async fn test_same_length_rewrite_within_one_tick_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, CSV).unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

        let mut cache = DatasetCache::default();
        let (first, _) = cache.get(&path).await.unwrap();

        // Same length, and the modification time does not move.
        std::fs::write(&path, "Region,Credit\nEast,7\nWest,8\n").unwrap();
        touch(&path, modified);

        let (second, status) = cache.get(&path).await.unwrap();
        assert_eq!(status, CacheStatus::Loaded);
        assert_ne!(first.data()[0].credit(), second.data()[0].credit());
    }

    #[tokio::test]
    async fn test_changed_file_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, CSV).unwrap();

        let mut cache = DatasetCache::default();
        let (first, _) = cache.get(&path).await.unwrap();

        std::fs::write(&path, "Region,Credit\nEast,1\nWest,2\nNorth,3\n").unwrap();
        let (second, status) = cache.get(&path).await.unwrap();
        assert_eq!(status, CacheStatus::Loaded);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 3);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        std::fs::write(&a, CSV).unwrap();
        std::fs::write(&b, CSV).unwrap();

        let mut cache = DatasetCache::default();
        cache.get(&a).await.unwrap();
        cache.get(&b).await.unwrap();
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate(&a).await);
        assert!(!cache.invalidate(&a).await);
        let (_, status) = cache.get(&a).await.unwrap();
        assert_eq!(status, CacheStatus::Loaded);

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let mut cache = DatasetCache::default();
        assert!(cache.get(&dir.path().join("missing.csv")).await.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_uses_its_timestamp_formats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        std::fs::write(&path, "Date,Credit\n24.12.2023,1\n").unwrap();

        let mut cache = DatasetCache::new(TimestampParser::new(["%d.%m.%Y"]));
        let (transactions, _) = cache.get(&path).await.unwrap();
        assert!(transactions.data()[0].timestamp().is_some());
    }
}
