//! In-process cache store.
//!
//! Entries live in a `HashMap` keyed by canonical key string behind a
//! `RwLock`. Lookups and writes are O(1) amortized; nothing survives a
//! process restart.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::traits::{CacheStore, KeyPredicate, StoredEntry};

/// A stored entry together with the key it was written under, so that
/// predicate-based removal can classify it without parsing strings.
#[derive(Debug, Clone)]
struct MemoryRecord {
    key: CacheKey,
    entry: StoredEntry,
}

/// Volatile cache tier.
///
/// The store has no capacity bound and never evicts. Like every store it is
/// TTL-blind, so an expired entry stays resident until its key is fetched
/// again (and overwritten) or an invalidation removes it. Entries for keys
/// that are never requested again live for the life of the process; callers
/// that need a bound should invalidate periodically, e.g.
/// `invalidate_fresh_content` on refresh.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, MemoryRecord>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, HashMap<String, MemoryRecord>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, lock_kind = "rwlock.read", "Recovered from poisoned cache lock");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, HashMap<String, MemoryRecord>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, lock_kind = "rwlock.write", "Recovered from poisoned cache lock");
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> Option<StoredEntry> {
        self.read("get")
            .get(&key.canonical_key())
            .map(|record| record.entry.clone())
    }

    async fn set(&self, key: &CacheKey, entry: StoredEntry) {
        self.write("set").insert(
            key.canonical_key(),
            MemoryRecord {
                key: key.clone(),
                entry,
            },
        );
    }

    async fn remove(&self, key: &CacheKey) {
        self.write("remove").remove(&key.canonical_key());
    }

    async fn remove_all(&self) -> u64 {
        let mut entries = self.write("remove_all");
        let removed = entries.len() as u64;
        entries.clear();
        debug!(store = "memory", removed, "Cleared cache store");
        removed
    }

    async fn remove_matching(&self, predicate: &KeyPredicate) -> u64 {
        let mut entries = self.write("remove_matching");
        let before = entries.len();
        entries.retain(|_, record| !predicate(&record.key));
        (before - entries.len()) as u64
    }

    async fn len(&self) -> usize {
        self.read("len").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::CacheEntry;
    use crate::cache::traits::{CacheStoreExt, CachedPayload};
    use chrono::Utc;
    use newsfeed_core::{Article, Category};

    fn article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Title {}", id),
            description: Some("desc".to_string()),
            url: format!("https://example.com/{}", id),
            source_name: "Example".to_string(),
            author: None,
            image_url: None,
            published_at: Utc::now(),
            content: None,
            category: None,
        }
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryCacheStore::new();
        assert!(store.get(&CacheKey::article("nope")).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_set_then_get_typed() {
        let store = MemoryCacheStore::new();
        let key = CacheKey::top_headlines("en", "us", 1);
        let listing = vec![article("a"), article("b")];
        store
            .set_typed(&key, CacheEntry::fresh(listing.clone()))
            .await;

        let read = store.get_typed::<Vec<Article>>(&key).await.unwrap();
        assert_eq!(read.into_data(), listing);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_shape_mismatch_reads_absent() {
        let store = MemoryCacheStore::new();
        let key = CacheKey::breaking_news("en", "us");
        store
            .set_typed(&key, CacheEntry::fresh(vec![article("a")]))
            .await;

        assert!(store.get_typed::<Article>(&key).await.is_none());
        // The entry itself is untouched by the failed typed read.
        assert!(store.get_typed::<Vec<Article>>(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_set_replaces_previous_entry() {
        let store = MemoryCacheStore::new();
        let key = CacheKey::article("a");
        store.set_typed(&key, CacheEntry::fresh(article("a"))).await;
        let mut updated = article("a");
        updated.title = "Updated".to_string();
        store.set_typed(&key, CacheEntry::fresh(updated)).await;

        let read = store.get_typed::<Article>(&key).await.unwrap();
        assert_eq!(read.data().title, "Updated");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_and_remove_missing() {
        let store = MemoryCacheStore::new();
        let key = CacheKey::article("a");
        store.set(&key, CacheEntry::fresh(CachedPayload::Article(article("a")))).await;

        store.remove(&CacheKey::article("other")).await;
        assert_eq!(store.len().await, 1);

        store.remove(&key).await;
        assert!(store.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_all() {
        let store = MemoryCacheStore::new();
        for id in ["a", "b", "c"] {
            store
                .set_typed(&CacheKey::article(id), CacheEntry::fresh(article(id)))
                .await;
        }
        assert_eq!(store.remove_all().await, 3);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_matching_keeps_articles() {
        let store = MemoryCacheStore::new();
        let listing = CacheEntry::fresh(vec![article("l")]);
        store
            .set_typed(&CacheKey::breaking_news("en", "us"), listing.clone())
            .await;
        store
            .set_typed(
                &CacheKey::category_headlines("en", Category::Science, "us", 1),
                listing,
            )
            .await;
        store
            .set_typed(&CacheKey::article("keep"), CacheEntry::fresh(article("keep")))
            .await;

        let removed = store.remove_matching(&|key| key.kind().is_listing()).await;
        assert_eq!(removed, 2);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&CacheKey::article("keep")).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_entries_stay_until_removed() {
        let store = MemoryCacheStore::new();
        let key = CacheKey::article("old");
        let written = Utc::now() - chrono::Duration::days(365);
        store
            .set_typed(&key, CacheEntry::new(article("old"), written))
            .await;

        let held = store.get_typed::<Article>(&key).await.unwrap();
        assert!(held.is_expired(std::time::Duration::from_secs(60)));
        assert_eq!(store.len().await, 1);

        store.remove_matching(&|k| !k.kind().is_listing()).await;
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_matching_through_dyn_store() {
        let store: std::sync::Arc<dyn CacheStore> = std::sync::Arc::new(MemoryCacheStore::new());
        store
            .set_typed(
                &CacheKey::breaking_news("en", "us"),
                CacheEntry::fresh(vec![article("b")]),
            )
            .await;
        store
            .set_typed(&CacheKey::article("a"), CacheEntry::fresh(article("a")))
            .await;

        let listings: Box<KeyPredicate> = Box::new(|key: &CacheKey| key.kind().is_listing());
        assert_eq!(store.remove_matching(listings.as_ref()).await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_corrupt_map() {
        let store = std::sync::Arc::new(MemoryCacheStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let key = CacheKey::article(format!("id-{}", i % 8));
                store
                    .set_typed(&key, CacheEntry::fresh(article(&i.to_string())))
                    .await;
                store.get_typed::<Article>(&key).await.is_some()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(store.len().await, 8);
    }
}
