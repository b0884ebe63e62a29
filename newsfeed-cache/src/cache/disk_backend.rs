//! File-backed cache store.
//!
//! Every key maps to one self-describing JSON record in a single directory,
//! so a corrupt or unreadable record affects only its own key.
//!
//! # Record naming
//!
//! The record name is the lowercase hex encoding of the canonical key.
//! Encodings longer than [`MAX_RECORD_STEM_LEN`] are replaced by
//! `h-<sha256 hex>`. Both forms use only `0-9 a-f` (plus the `h-` prefix),
//! so names stay distinct on case-insensitive filesystems, and they cannot
//! collide with each other since plain hex never contains `-`.
//!
//! # Record format
//!
//! ```json
//! { "version": 1, "key": { "kind": "article", "id": "..." },
//!   "entry": { "data": { "shape": "article", "data": { ... } },
//!              "timestamp": "2024-05-01T12:00:00Z" } }
//! ```
//!
//! Storing the key inside the record lets predicate-based removal classify
//! records without an index, and guards reads against digest collisions.
//!
//! # Crash safety
//!
//! Writes go to a uniquely named temp file that is renamed over the record.
//! A write interrupted at any point leaves either the old record or the new
//! one, never a truncated file under the record name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use super::key::CacheKey;
use super::traits::{CacheStore, KeyPredicate, StoredEntry};
use crate::constants::{
    DISK_RECORD_VERSION, HASHED_RECORD_PREFIX, MAX_RECORD_STEM_LEN, RECORD_EXTENSION,
    TEMP_FILE_PREFIX,
};

/// Error type for durable store operations.
///
/// These never leave the store: the [`CacheStore`] impl logs and absorbs them.
#[derive(Debug, thiserror::Error)]
pub enum DiskCacheError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode a record.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A record exists but cannot be decoded.
    #[error("Corrupt record {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl DiskCacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Leading fields of a record, enough to classify it without decoding the payload.
#[derive(Debug, Deserialize)]
struct DiskRecordHeader {
    version: u32,
    key: CacheKey,
}

/// On-disk record layout.
#[derive(Debug, Serialize, Deserialize)]
struct DiskRecord {
    version: u32,
    key: CacheKey,
    entry: StoredEntry,
}

/// Durable cache tier: one JSON file per key under `root`.
///
/// # Example
///
/// ```ignore
/// let store = DiskCacheStore::open("/var/cache/newsfeed").await?;
/// store.set_typed(&CacheKey::article(id), CacheEntry::fresh(article)).await;
/// ```
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    root: PathBuf,
}

impl DiskCacheStore {
    /// Open (creating if needed) a store rooted at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, DiskCacheError> {
        let root = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| DiskCacheError::io(&root, e))?;
        Ok(Self { root })
    }

    /// Directory holding the records.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filename stem for a key.
    pub fn record_stem(key: &CacheKey) -> String {
        let canonical = key.canonical_key();
        let encoded = hex::encode(canonical.as_bytes());
        if encoded.len() <= MAX_RECORD_STEM_LEN {
            encoded
        } else {
            let digest = Sha256::digest(canonical.as_bytes());
            format!("{}{}", HASHED_RECORD_PREFIX, hex::encode(digest))
        }
    }

    /// Full path of the record for a key.
    pub fn record_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(format!("{}.{}", Self::record_stem(key), RECORD_EXTENSION))
    }

    /// Read and decode the record at `path`. `Ok(None)` if it does not exist.
    async fn read_record(&self, path: &Path) -> Result<Option<DiskRecord>, DiskCacheError> {
        let Some(bytes) = Self::read_bytes(path).await? else {
            return Ok(None);
        };
        let record: DiskRecord = Self::decode(path, &bytes)?;
        Self::check_version(path, record.version)?;
        Ok(Some(record))
    }

    /// Read only the version and key of the record at `path`.
    async fn read_header(&self, path: &Path) -> Result<Option<DiskRecordHeader>, DiskCacheError> {
        let Some(bytes) = Self::read_bytes(path).await? else {
            return Ok(None);
        };
        let header: DiskRecordHeader = Self::decode(path, &bytes)?;
        Self::check_version(path, header.version)?;
        Ok(Some(header))
    }

    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>, DiskCacheError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DiskCacheError::io(path, e)),
        }
    }

    fn decode<'de, T: Deserialize<'de>>(path: &Path, bytes: &'de [u8]) -> Result<T, DiskCacheError> {
        serde_json::from_slice(bytes).map_err(|e| DiskCacheError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn check_version(path: &Path, version: u32) -> Result<(), DiskCacheError> {
        if version == DISK_RECORD_VERSION {
            Ok(())
        } else {
            Err(DiskCacheError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("unsupported record version {}", version),
            })
        }
    }

    /// Encode and atomically replace the record for `key`.
    async fn write_record(&self, key: &CacheKey, entry: StoredEntry) -> Result<(), DiskCacheError> {
        let record = DiskRecord {
            version: DISK_RECORD_VERSION,
            key: key.clone(),
            entry,
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| DiskCacheError::Serialization(e.to_string()))?;

        let target = self.record_path(key);
        let temp = self
            .root
            .join(format!("{}{}", TEMP_FILE_PREFIX, Uuid::now_v7()));

        if let Err(e) = tokio::fs::write(&temp, &bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(DiskCacheError::io(&temp, e));
        }
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(DiskCacheError::io(&target, e));
        }
        Ok(())
    }

    /// Delete one file. Missing files are not an error.
    async fn delete_file(&self, path: &Path) -> Result<bool, DiskCacheError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DiskCacheError::io(path, e)),
        }
    }

    /// List committed record files and leftover temp files.
    async fn scan(&self) -> Result<(Vec<PathBuf>, Vec<PathBuf>), DiskCacheError> {
        let mut records = Vec::new();
        let mut temps = Vec::new();

        let mut dir = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| DiskCacheError::io(&self.root, e))?;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| DiskCacheError::io(&self.root, e))?
        {
            let path = item.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(TEMP_FILE_PREFIX) {
                temps.push(path);
            } else if path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION) {
                records.push(path);
            }
        }

        Ok((records, temps))
    }

    async fn try_remove_all(&self) -> Result<u64, DiskCacheError> {
        let (records, temps) = self.scan().await?;
        let mut removed = 0u64;
        for path in &records {
            if self.delete_file(path).await? {
                removed += 1;
            }
        }
        for path in &temps {
            self.delete_file(path).await?;
        }
        Ok(removed)
    }

    async fn try_remove_matching(
        &self,
        predicate: &KeyPredicate,
    ) -> Result<u64, DiskCacheError> {
        let (records, _) = self.scan().await?;
        let mut removed = 0u64;
        for path in &records {
            match self.read_header(path).await {
                Ok(Some(header)) if predicate(&header.key) => {
                    if self.delete_file(path).await? {
                        removed += 1;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    // Unclassifiable; only a full clear removes it.
                    warn!(error = %e, "Skipping unreadable record during selective removal");
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, key: &CacheKey) -> Option<StoredEntry> {
        let path = self.record_path(key);
        match self.read_record(&path).await {
            Ok(Some(record)) if record.key == *key => Some(record.entry),
            Ok(Some(record)) => {
                warn!(
                    key = %key,
                    stored_key = %record.key,
                    "Record belongs to a different key, treating as absent"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache record, treating as absent");
                None
            }
        }
    }

    async fn set(&self, key: &CacheKey, entry: StoredEntry) {
        if let Err(e) = self.write_record(key, entry).await {
            warn!(key = %key, error = %e, "Failed to persist cache record");
        }
    }

    async fn remove(&self, key: &CacheKey) {
        if let Err(e) = self.delete_file(&self.record_path(key)).await {
            warn!(key = %key, error = %e, "Failed to delete cache record");
        }
    }

    async fn remove_all(&self) -> u64 {
        match self.try_remove_all().await {
            Ok(removed) => {
                debug!(store = "disk", removed, "Cleared cache store");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear durable cache");
                0
            }
        }
    }

    async fn remove_matching(&self, predicate: &KeyPredicate) -> u64 {
        match self.try_remove_matching(predicate).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Failed to remove matching cache records");
                0
            }
        }
    }

    async fn len(&self) -> usize {
        match self.scan().await {
            Ok((records, _)) => records.len(),
            Err(e) => {
                warn!(error = %e, "Failed to list durable cache");
                0
            }
        }
    }
}
