//! Cache store trait and typed payload conversion.
//!
//! A store is type-erased: it holds entries of any supported payload shape
//! under one key namespace. Payloads are a closed tagged union
//! ([`CachedPayload`]); typed reads go through [`CacheStoreExt::get_typed`],
//! which reports a shape mismatch as an absent entry.

use async_trait::async_trait;
use newsfeed_core::Article;
use serde::{Deserialize, Serialize};

use super::entry::CacheEntry;
use super::key::CacheKey;

/// Every payload shape a store can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "data", rename_all = "snake_case")]
pub enum CachedPayload {
    /// An ordered listing.
    Articles(Vec<Article>),
    /// A single addressed item.
    Article(Article),
}

impl CachedPayload {
    pub fn shape(&self) -> &'static str {
        match self {
            CachedPayload::Articles(_) => "articles",
            CachedPayload::Article(_) => "article",
        }
    }
}

/// Key classifier passed to [`CacheStore::remove_matching`].
///
/// The bound is spelled out as higher-ranked: `#[async_trait]` would
/// otherwise name the elided key lifetime and tie it to the call.
pub type KeyPredicate = dyn for<'k> Fn(&'k CacheKey) -> bool + Send + Sync;

/// A type-erased entry as held by a store.
pub type StoredEntry = CacheEntry<CachedPayload>;

/// Conversion between a concrete payload type and [`CachedPayload`].
///
/// `from_cached` returns `None` when the stored shape does not match.
pub trait CachePayload: Clone + Send + Sync + 'static {
    fn into_cached(self) -> CachedPayload;

    fn from_cached(payload: CachedPayload) -> Option<Self>;
}

impl CachePayload for Vec<Article> {
    fn into_cached(self) -> CachedPayload {
        CachedPayload::Articles(self)
    }

    fn from_cached(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Articles(articles) => Some(articles),
            CachedPayload::Article(_) => None,
        }
    }
}

impl CachePayload for Article {
    fn into_cached(self) -> CachedPayload {
        CachedPayload::Article(self)
    }

    fn from_cached(payload: CachedPayload) -> Option<Self> {
        match payload {
            CachedPayload::Article(article) => Some(article),
            CachedPayload::Articles(_) => None,
        }
    }
}

/// Keyed container for cache entries.
///
/// Stores are policy-blind: they know nothing about TTLs and only remove
/// entries when asked. Implementations must be safe to share across
/// concurrent requests.
///
/// # Failure semantics
///
/// No method fails. A missing, unreadable or corrupt entry is reported as
/// `None`; write and removal failures are logged and swallowed inside the
/// implementation, so caching stays best-effort.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Read the entry for `key`.
    async fn get(&self, key: &CacheKey) -> Option<StoredEntry>;

    /// Write `entry` under `key`, replacing any previous entry.
    async fn set(&self, key: &CacheKey, entry: StoredEntry);

    /// Delete the entry for exactly `key`. No-op if absent.
    async fn remove(&self, key: &CacheKey);

    /// Delete every entry. Returns the number removed.
    async fn remove_all(&self) -> u64;

    /// Delete every entry whose key satisfies `predicate`.
    /// Returns the number removed.
    async fn remove_matching(&self, predicate: &KeyPredicate) -> u64;

    /// Number of entries currently held.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Typed access on top of [`CacheStore`].
#[async_trait]
pub trait CacheStoreExt {
    /// Read the entry for `key` as `T`. `None` if absent or of another shape.
    async fn get_typed<T: CachePayload>(&self, key: &CacheKey) -> Option<CacheEntry<T>>;

    /// Write a typed entry under `key`.
    async fn set_typed<T: CachePayload>(&self, key: &CacheKey, entry: CacheEntry<T>);
}

#[async_trait]
impl<S> CacheStoreExt for S
where
    S: CacheStore + ?Sized,
{
    async fn get_typed<T: CachePayload>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        self.get(key).await?.and_then(T::from_cached)
    }

    async fn set_typed<T: CachePayload>(&self, key: &CacheKey, entry: CacheEntry<T>) {
        self.set(key, entry.map(T::into_cached)).await
    }
}
