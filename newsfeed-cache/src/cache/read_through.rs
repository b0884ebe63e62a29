//! Cache-aside decorator around a [`NewsSource`].
//!
//! [`CachingNewsSource`] implements [`NewsSource`] itself, so callers use it
//! exactly like the source it wraps. Per call it:
//!
//! 1. derives the [`CacheKey`] from the call parameters,
//! 2. reads the primary tier, then the durable tier if the primary had
//!    nothing valid and the key's kind is persisted,
//! 3. returns a non-expired entry without calling the source or writing,
//! 4. otherwise calls the source; on success writes a fresh entry to the
//!    primary tier (and the durable tier if the kind is persisted) and
//!    returns the payload; on failure returns the error unchanged.
//!
//! Expired entries are never served, not even when the source fails.
//! Concurrent misses for the same key are not collapsed: each calls the
//! source and the last write wins.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use newsfeed_core::{Article, Category, ConfigError, FeedResult};
use tracing::{debug, info, warn};

use super::disk_backend::{DiskCacheError, DiskCacheStore};
use super::entry::CacheEntry;
use super::key::{CacheKey, KeyKind};
use super::memory_backend::MemoryCacheStore;
use super::traits::{CachePayload, CacheStore, CacheStoreExt, KeyPredicate};
use super::ttl::TtlPolicy;
use crate::constants::{ENV_CACHE_DIR, ENV_PERSIST_KINDS, ENV_PROMOTE_DURABLE_HITS};
use crate::source::NewsSource;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the caching decorator.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL per content class.
    pub ttl_policy: TtlPolicy,
    /// Key kinds written to and read from the durable tier.
    pub durable_kinds: BTreeSet<KeyKind>,
    /// Copy entries found only in the durable tier into the primary tier.
    pub promote_durable_hits: bool,
    /// Directory for the durable tier, if one should be opened.
    pub durable_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_policy: TtlPolicy::default(),
            durable_kinds: KeyKind::ALL.into_iter().collect(),
            promote_durable_hits: false,
            durable_dir: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Set which key kinds are persisted.
    pub fn with_durable_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = KeyKind>,
    {
        self.durable_kinds = kinds.into_iter().collect();
        self
    }

    /// Enable or disable promotion of durable hits.
    pub fn with_promote_durable_hits(mut self, enabled: bool) -> Self {
        self.promote_durable_hits = enabled;
        self
    }

    /// Set the durable tier directory.
    pub fn with_durable_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.durable_dir = Some(dir.into());
        self
    }

    /// Whether entries of `kind` go to the durable tier.
    pub fn persists(&self, kind: KeyKind) -> bool {
        self.durable_kinds.contains(&kind)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ttl_policy.validate()
    }

    /// Create CacheConfig from environment variables.
    ///
    /// Environment variables:
    /// - TTL overrides, see [`TtlPolicy::from_env`]
    /// - `NEWSFEED_CACHE_DIR`: durable tier directory (default: none)
    /// - `NEWSFEED_CACHE_PERSIST_KINDS`: comma-separated key kinds to persist,
    ///   e.g. `article,top_headlines`; empty persists nothing (default: all)
    /// - `NEWSFEED_CACHE_PROMOTE_DURABLE_HITS`: "true" or "false" (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`CacheConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl_policy = TtlPolicy::from_lookup(&lookup)?;

        let durable_dir = lookup(ENV_CACHE_DIR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let durable_kinds = match lookup(ENV_PERSIST_KINDS) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<KeyKind>() {
                    Ok(kind) => Some(kind),
                    Err(e) => {
                        warn!(var = ENV_PERSIST_KINDS, error = %e, "Ignoring unknown key kind");
                        None
                    }
                })
                .collect(),
            None => KeyKind::ALL.into_iter().collect(),
        };

        let promote_durable_hits = lookup(ENV_PROMOTE_DURABLE_HITS)
            .map(|s| {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1"
            })
            .unwrap_or(false);

        Ok(Self {
            ttl_policy,
            durable_kinds,
            promote_durable_hits,
            durable_dir,
        })
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Counters describing how requests were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from either tier.
    pub hits: u64,
    /// Subset of `hits` served from the durable tier.
    pub durable_hits: u64,
    /// Requests that went to the source.
    pub misses: u64,
    /// Subset of `misses` where an expired entry was present.
    pub expired: u64,
    /// Source calls that failed.
    pub source_failures: u64,
    /// Fresh entries written after a successful fetch.
    pub writes: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct StatsCounters {
    hits: AtomicU64,
    durable_hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    source_failures: AtomicU64,
    writes: AtomicU64,
}

impl StatsCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            durable_hits: self.durable_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// CACHING DECORATOR
// ============================================================================

/// A [`NewsSource`] that serves from cache when it can.
///
/// # Example
///
/// ```ignore
/// let config = CacheConfig::from_env()?;
/// let news = CachingNewsSource::open(http_source, config).await?;
///
/// // Same interface as the wrapped source.
/// let headlines = news.top_headlines("en", "us", 1).await?;
///
/// // Pull-to-refresh: drop listings, keep articles.
/// news.invalidate_fresh_content().await;
/// ```
pub struct CachingNewsSource<S> {
    source: S,
    primary: Arc<dyn CacheStore>,
    durable: Option<Arc<dyn CacheStore>>,
    config: CacheConfig,
    stats: Arc<StatsCounters>,
}

impl<S> CachingNewsSource<S>
where
    S: NewsSource,
{
    /// Wrap `source` with a single primary tier.
    pub fn new(source: S, primary: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            source,
            primary,
            durable: None,
            config,
            stats: Arc::new(StatsCounters::default()),
        }
    }

    /// Wrap `source` with a fresh in-memory primary tier.
    pub fn in_memory(source: S, config: CacheConfig) -> Self {
        Self::new(source, Arc::new(MemoryCacheStore::new()), config)
    }

    /// Wrap `source` with an in-memory primary tier and, if
    /// `config.durable_dir` is set, a file-backed durable tier.
    pub async fn open(source: S, config: CacheConfig) -> Result<Self, DiskCacheError> {
        let durable = match &config.durable_dir {
            Some(dir) => Some(DiskCacheStore::open(dir).await?),
            None => None,
        };
        let cache = Self::in_memory(source, config);
        Ok(match durable {
            Some(store) => cache.with_durable(Arc::new(store)),
            None => cache,
        })
    }

    /// Attach a durable tier.
    pub fn with_durable(mut self, durable: Arc<dyn CacheStore>) -> Self {
        self.durable = Some(durable);
        self
    }

    /// Get a reference to the wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn primary(&self) -> &Arc<dyn CacheStore> {
        &self.primary
    }

    pub fn durable(&self) -> Option<&Arc<dyn CacheStore>> {
        self.durable.as_ref()
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Snapshot of the request counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Every configured tier, primary first.
    fn tiers(&self) -> impl Iterator<Item = &Arc<dyn CacheStore>> {
        std::iter::once(&self.primary).chain(self.durable.iter())
    }

    /// The durable tier, if configured and `kind` is persisted.
    fn durable_for(&self, kind: KeyKind) -> Option<&Arc<dyn CacheStore>> {
        self.durable
            .as_ref()
            .filter(|_| self.config.persists(kind))
    }

    /// Serve `key` from cache, or call `fetch` and cache its result.
    async fn fetch_through<T, F, Fut>(&self, key: CacheKey, fetch: F) -> FeedResult<T>
    where
        T: CachePayload,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = FeedResult<T>> + Send,
    {
        let ttl = self.config.ttl_policy.ttl_for(&key);
        let now = Utc::now();
        let mut expired = false;

        if let Some(entry) = self.primary.get_typed::<T>(&key).await {
            if !entry.is_expired_at(now, ttl) {
                StatsCounters::bump(&self.stats.hits);
                debug!(key = %key, tier = self.primary.name(), "Cache hit");
                return Ok(entry.into_data());
            }
            expired = true;
        }

        if let Some(durable) = self.durable_for(key.kind()) {
            if let Some(entry) = durable.get_typed::<T>(&key).await {
                if !entry.is_expired_at(now, ttl) {
                    StatsCounters::bump(&self.stats.hits);
                    StatsCounters::bump(&self.stats.durable_hits);
                    debug!(key = %key, tier = durable.name(), "Cache hit");
                    if self.config.promote_durable_hits {
                        self.primary.set_typed(&key, entry.clone()).await;
                    }
                    return Ok(entry.into_data());
                }
                expired = true;
            }
        }

        StatsCounters::bump(&self.stats.misses);
        if expired {
            StatsCounters::bump(&self.stats.expired);
        }
        debug!(key = %key, expired, ttl = ?ttl, "Cache miss, fetching from source");

        match fetch().await {
            Ok(data) => {
                self.write(&key, CacheEntry::fresh(data.clone())).await;
                Ok(data)
            }
            Err(e) => {
                StatsCounters::bump(&self.stats.source_failures);
                debug!(key = %key, error = %e, "Source fetch failed, nothing cached");
                Err(e)
            }
        }
    }

    async fn write<T: CachePayload>(&self, key: &CacheKey, entry: CacheEntry<T>) {
        if let Some(durable) = self.durable_for(key.kind()) {
            durable.set_typed(key, entry.clone()).await;
        }
        self.primary.set_typed(key, entry).await;
        StatsCounters::bump(&self.stats.writes);
    }

    // ========================================================================
    // INVALIDATION
    // ========================================================================

    /// Remove every entry from every tier.
    ///
    /// Returns the number of records removed, summed across tiers.
    pub async fn invalidate_all(&self) -> u64 {
        let mut removed = 0;
        for store in self.tiers() {
            removed += store.remove_all().await;
        }
        info!(removed, "Invalidated entire cache");
        removed
    }

    /// Remove the given keys from every tier. An empty slice removes nothing.
    pub async fn invalidate_keys(&self, keys: &[CacheKey]) {
        for key in keys {
            for store in self.tiers() {
                store.remove(key).await;
            }
        }
        if !keys.is_empty() {
            debug!(count = keys.len(), "Invalidated cache keys");
        }
    }

    /// Remove a single key from every tier.
    pub async fn invalidate_key(&self, key: &CacheKey) {
        self.invalidate_keys(std::slice::from_ref(key)).await
    }

    /// Remove all listing content (breaking news, top headlines, category
    /// headlines) from every tier, keeping single articles.
    ///
    /// Returns the number of records removed, summed across tiers.
    pub async fn invalidate_fresh_content(&self) -> u64 {
        let removed = self
            .remove_matching(&|key: &CacheKey| key.kind().is_listing())
            .await;
        info!(removed, "Invalidated fresh content");
        removed
    }

    /// Remove every entry of one kind from every tier.
    pub async fn invalidate_kind(&self, kind: KeyKind) -> u64 {
        let removed = self
            .remove_matching(&move |key: &CacheKey| key.kind() == kind)
            .await;
        info!(kind = %kind, removed, "Invalidated key kind");
        removed
    }

    async fn remove_matching(&self, predicate: &KeyPredicate) -> u64 {
        let mut removed = 0;
        for store in self.tiers() {
            removed += store.remove_matching(predicate).await;
        }
        removed
    }
}

#[async_trait]
impl<S> NewsSource for CachingNewsSource<S>
where
    S: NewsSource,
{
    async fn top_headlines(
        &self,
        language: &str,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>> {
        let key = CacheKey::top_headlines(language, country, page);
        self.fetch_through(key, || self.source.top_headlines(language, country, page))
            .await
    }

    async fn breaking_news(&self, language: &str, country: &str) -> FeedResult<Vec<Article>> {
        let key = CacheKey::breaking_news(language, country);
        self.fetch_through(key, || self.source.breaking_news(language, country))
            .await
    }

    async fn category_headlines(
        &self,
        language: &str,
        category: Category,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>> {
        let key = CacheKey::category_headlines(language, category, country, page);
        self.fetch_through(key, || {
            self.source
                .category_headlines(language, category, country, page)
        })
        .await
    }

    async fn article(&self, id: &str) -> FeedResult<Article> {
        let key = CacheKey::article(id);
        self.fetch_through(key, || self.source.article(id)).await
    }
}

impl<S> Clone for CachingNewsSource<S>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            primary: Arc::clone(&self.primary),
            durable: self.durable.clone(),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ttl::TtlClass;
    use crate::constants::ENV_TTL_BREAKING_NEWS_SECS;
    use newsfeed_core::{FeedError, SourceError};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    // Minimal source: every call returns one article named after the call.
    #[derive(Default)]
    struct EchoSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EchoSource {
        fn respond(&self, id: &str) -> FeedResult<Article> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Transport {
                    reason: "offline".to_string(),
                }
                .into());
            }
            Ok(Article {
                id: id.to_string(),
                title: id.to_string(),
                description: None,
                url: format!("https://example.com/{}", id),
                source_name: "Echo".to_string(),
                author: None,
                image_url: None,
                published_at: Utc::now(),
                content: None,
                category: None,
            })
        }
    }

    #[async_trait]
    impl NewsSource for EchoSource {
        async fn top_headlines(&self, l: &str, c: &str, p: u32) -> FeedResult<Vec<Article>> {
            Ok(vec![self.respond(&format!("top-{}-{}-{}", l, c, p))?])
        }

        async fn breaking_news(&self, l: &str, c: &str) -> FeedResult<Vec<Article>> {
            Ok(vec![self.respond(&format!("breaking-{}-{}", l, c))?])
        }

        async fn category_headlines(
            &self,
            l: &str,
            cat: Category,
            c: &str,
            p: u32,
        ) -> FeedResult<Vec<Article>> {
            Ok(vec![self.respond(&format!("cat-{}-{}-{}-{}", l, cat, c, p))?])
        }

        async fn article(&self, id: &str) -> FeedResult<Article> {
            self.respond(id)
        }
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_ttl_policy(
                TtlPolicy::default().with_ttl(TtlClass::BreakingNews, Duration::from_secs(10)),
            )
            .with_durable_kinds([KeyKind::Article])
            .with_promote_durable_hits(true)
            .with_durable_dir("/tmp/newsfeed");

        assert_eq!(
            config.ttl_policy.ttl_for_class(TtlClass::BreakingNews),
            Duration::from_secs(10)
        );
        assert!(config.persists(KeyKind::Article));
        assert!(!config.persists(KeyKind::TopHeadlines));
        assert!(config.promote_durable_hits);
        assert_eq!(config.durable_dir, Some(PathBuf::from("/tmp/newsfeed")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_persists_everything() {
        let config = CacheConfig::default();
        assert!(KeyKind::ALL.iter().all(|k| config.persists(*k)));
        assert!(!config.promote_durable_hits);
        assert!(config.durable_dir.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_TTL_BREAKING_NEWS_SECS, "60"),
            (ENV_CACHE_DIR, " /var/cache/newsfeed "),
            (ENV_PERSIST_KINDS, "article, top_headlines,bogus"),
            (ENV_PROMOTE_DURABLE_HITS, "TRUE"),
        ]
        .into_iter()
        .collect();
        let config =
            CacheConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(
            config.ttl_policy.ttl_for_class(TtlClass::BreakingNews),
            Duration::from_secs(60)
        );
        assert_eq!(config.durable_dir, Some(PathBuf::from("/var/cache/newsfeed")));
        assert_eq!(
            config.durable_kinds,
            [KeyKind::Article, KeyKind::TopHeadlines].into_iter().collect()
        );
        assert!(config.promote_durable_hits);
    }

    #[test]
    fn test_config_from_lookup_empty_persist_list_disables_durable_writes() {
        let config = CacheConfig::from_lookup(|name| {
            (name == ENV_PERSIST_KINDS).then(String::new)
        })
        .unwrap();
        assert!(config.durable_kinds.is_empty());
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);
        assert!((CacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = CachingNewsSource::in_memory(EchoSource::default(), CacheConfig::default());

        let first = cache.article("a").await.unwrap();
        let second = cache.article("a").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.writes), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_failure_is_propagated_and_not_cached() {
        let source = EchoSource {
            fail: true,
            ..Default::default()
        };
        let cache = CachingNewsSource::in_memory(source, CacheConfig::default());

        let err = cache.breaking_news("en", "us").await.unwrap_err();
        assert_eq!(
            err,
            FeedError::from(SourceError::Transport {
                reason: "offline".to_string()
            })
        );
        assert!(cache.primary().is_empty().await);
        assert_eq!(cache.stats().source_failures, 1);
    }

    #[tokio::test]
    async fn test_distinct_pages_are_cached_separately() {
        let cache = CachingNewsSource::in_memory(EchoSource::default(), CacheConfig::default());

        let p1 = cache.top_headlines("en", "us", 1).await.unwrap();
        let p2 = cache.top_headlines("en", "us", 2).await.unwrap();

        assert_ne!(p1, p2);
        assert_eq!(cache.primary().len().await, 2);
    }

    #[tokio::test]
    async fn test_clone_shares_stores_and_stats() {
        #[derive(Clone, Default)]
        struct Shared(Arc<EchoSource>);

        #[async_trait]
        impl NewsSource for Shared {
            async fn top_headlines(&self, l: &str, c: &str, p: u32) -> FeedResult<Vec<Article>> {
                self.0.top_headlines(l, c, p).await
            }
            async fn breaking_news(&self, l: &str, c: &str) -> FeedResult<Vec<Article>> {
                self.0.breaking_news(l, c).await
            }
            async fn category_headlines(
                &self,
                l: &str,
                cat: Category,
                c: &str,
                p: u32,
            ) -> FeedResult<Vec<Article>> {
                self.0.category_headlines(l, cat, c, p).await
            }
            async fn article(&self, id: &str) -> FeedResult<Article> {
                self.0.article(id).await
            }
        }

        let cache = CachingNewsSource::in_memory(Shared::default(), CacheConfig::default());
        let clone = cache.clone();

        cache.category_headlines("en", Category::Sports, "us", 1).await.unwrap();
        clone.category_headlines("en", Category::Sports, "us", 1).await.unwrap();

        assert_eq!(cache.source().0.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
    }
}
