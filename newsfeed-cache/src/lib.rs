//! Newsfeed Cache - cache-aside layer for remote news sources.
//!
//! Wraps any [`NewsSource`] in a [`CachingNewsSource`] that serves repeat
//! requests from an in-memory tier and, optionally, a durable on-disk tier.

pub mod cache;
pub mod constants;
pub mod source;

pub use source::NewsSource;

// Re-export cache types for app integration
pub use cache::{
    CacheConfig, CacheEntry, CacheKey, CachePayload, CacheStats, CacheStore, CacheStoreExt,
    CachedPayload, CachingNewsSource, DiskCacheError, DiskCacheStore, KeyKind, KeyPredicate,
    MemoryCacheStore, StoredEntry, TtlClass, TtlPolicy,
};
