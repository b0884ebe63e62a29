//! Cache layer for news content.
//!
//! Responses from a [`NewsSource`](crate::source::NewsSource) are cached
//! under typed [`CacheKey`]s with a per-class TTL. Two store tiers are
//! supported: a volatile in-memory primary tier and an optional file-backed
//! durable tier that survives restarts.
//!
//! # Expiry
//!
//! Entries carry only their creation time. Whether an entry is still valid
//! is decided at read time by the [`TtlPolicy`], so retuning TTLs applies to
//! entries already on disk.
//!
//! # Example
//!
//! ```ignore
//! let news = CachingNewsSource::in_memory(source, CacheConfig::default());
//!
//! // First call fetches, second is a hit.
//! let a = news.article("abc").await?;
//! let b = news.article("abc").await?;
//! assert_eq!(news.stats().hits, 1);
//! ```

pub mod disk_backend;
pub mod entry;
pub mod key;
pub mod memory_backend;
pub mod read_through;
pub mod traits;
pub mod ttl;

pub use disk_backend::{DiskCacheError, DiskCacheStore};
pub use entry::CacheEntry;
pub use key::{CacheKey, KeyKind};
pub use memory_backend::MemoryCacheStore;
pub use read_through::{CacheConfig, CacheStats, CachingNewsSource};
pub use traits::{
    CachePayload, CacheStore, CacheStoreExt, CachedPayload, KeyPredicate, StoredEntry,
};
pub use ttl::{TtlClass, TtlPolicy};
