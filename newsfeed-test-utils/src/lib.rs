//! Newsfeed Test Utilities
//!
//! Shared test infrastructure for the newsfeed workspace:
//! - Proptest generators for content and cache keys
//! - A scripted mock news source with call recording and failure injection
//! - A call-counting cache store wrapper
//! - Fixtures for common scenarios

// Re-export core types for convenience
pub use newsfeed_core::{Article, Category, ConfigError, FeedError, FeedResult, SourceError, Timestamp};

// Re-export cache types used by most tests
pub use newsfeed_cache::{
    CacheConfig, CacheEntry, CacheKey, CacheStats, CacheStore, CacheStoreExt, CachedPayload,
    CachingNewsSource, DiskCacheStore, KeyKind, KeyPredicate, MemoryCacheStore, NewsSource,
    StoredEntry, TtlClass, TtlPolicy,
};

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Install a fmt subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`; defaults to `warn`. Safe to call from every test.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// MOCK NEWS SOURCE
// ============================================================================

/// A call received by [`MockNewsSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    TopHeadlines {
        language: String,
        country: String,
        page: u32,
    },
    BreakingNews {
        language: String,
        country: String,
    },
    CategoryHeadlines {
        language: String,
        category: Category,
        country: String,
        page: u32,
    },
    Article {
        id: String,
    },
}

/// Deterministic in-process news source.
///
/// Every successful response is tagged with a generation number in the
/// article titles (`"... #<n>"`), so a test can tell a cached response from
/// a refetched one.
#[derive(Debug, Default)]
pub struct MockNewsSource {
    calls: Mutex<Vec<SourceCall>>,
    failure: Mutex<Option<FeedError>>,
    delay: Mutex<Option<Duration>>,
    generation: AtomicU64,
    listing_len: Mutex<Option<usize>>,
}

impl MockNewsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call with `error`.
    pub fn fail_with(&self, error: impl Into<FeedError>) {
        *lock(&self.failure) = Some(error.into());
    }

    /// Stop injecting failures.
    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// Sleep for `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    /// Number of articles per listing response (default 3).
    pub fn set_listing_len(&self, len: usize) {
        *lock(&self.listing_len) = Some(len);
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Forget recorded calls.
    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    async fn begin(&self, call: SourceCall) -> FeedResult<u64> {
        lock(&self.calls).push(call);
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = lock(&self.failure).clone();
        match failure {
            Some(error) => Err(error),
            None => Ok(self.generation.fetch_add(1, Ordering::SeqCst) + 1),
        }
    }

    fn listing(&self, label: &str, generation: u64, category: Option<Category>) -> Vec<Article> {
        let len = lock(&self.listing_len).unwrap_or(3);
        (0..len)
            .map(|n| {
                let mut article = fixtures::sample_article(&format!("{}-{}", label, n));
                article.title = format!("{} #{}", article.title, generation);
                article.category = category;
                article
            })
            .collect()
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    async fn top_headlines(
        &self,
        language: &str,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>> {
        let generation = self
            .begin(SourceCall::TopHeadlines {
                language: language.to_string(),
                country: country.to_string(),
                page,
            })
            .await?;
        let label = format!("top-{}-{}-p{}", language, country, page);
        Ok(self.listing(&label, generation, None))
    }

    async fn breaking_news(&self, language: &str, country: &str) -> FeedResult<Vec<Article>> {
        let generation = self
            .begin(SourceCall::BreakingNews {
                language: language.to_string(),
                country: country.to_string(),
            })
            .await?;
        let label = format!("breaking-{}-{}", language, country);
        Ok(self.listing(&label, generation, None))
    }

    async fn category_headlines(
        &self,
        language: &str,
        category: Category,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>> {
        let generation = self
            .begin(SourceCall::CategoryHeadlines {
                language: language.to_string(),
                category,
                country: country.to_string(),
                page,
            })
            .await?;
        let label = format!("{}-{}-{}-p{}", category, language, country, page);
        Ok(self.listing(&label, generation, Some(category)))
    }

    async fn article(&self, id: &str) -> FeedResult<Article> {
        let generation = self.begin(SourceCall::Article { id: id.to_string() }).await?;
        let mut article = fixtures::sample_article(id);
        article.title = format!("{} #{}", article.title, generation);
        article.content = Some(format!("Full text of {}", id));
        Ok(article)
    }
}

// ============================================================================
// COUNTING STORE
// ============================================================================

/// Store wrapper that counts calls reaching the inner store.
#[derive(Debug, Default)]
pub struct CountingStore<S> {
    inner: S,
    gets: AtomicU64,
    sets: AtomicU64,
    removes: AtomicU64,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gets: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            removes: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn gets(&self) -> u64 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> u64 {
        self.sets.load(Ordering::SeqCst)
    }

    /// Calls to `remove`, `remove_all` and `remove_matching`.
    pub fn removes(&self) -> u64 {
        self.removes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S> CacheStore for CountingStore<S>
where
    S: CacheStore,
{
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn get(&self, key: &CacheKey) -> Option<StoredEntry> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, entry: StoredEntry) {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, entry).await
    }

    async fn remove(&self, key: &CacheKey) {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    async fn remove_all(&self) -> u64 {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_all().await
    }

    async fn remove_matching(&self, predicate: &KeyPredicate) -> u64 {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_matching(predicate).await
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for content and cache keys.

    use super::*;
    use proptest::prelude::*;

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64).prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    pub fn arb_category() -> impl Strategy<Value = Category> {
        proptest::sample::select(Category::ALL.to_vec())
    }

    /// Identifier text including separators and path characters.
    pub fn arb_component() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9:/%.\\- ]{0,24}"
    }

    pub fn arb_article() -> impl Strategy<Value = Article> {
        (
            "[a-zA-Z0-9\\-]{1,32}",
            "[a-zA-Z0-9 .,!?]{1,120}",
            proptest::option::of("[a-zA-Z0-9 .,]{0,200}"),
            "[a-zA-Z ]{1,24}",
            proptest::option::of("[a-zA-Z ]{1,24}"),
            arb_timestamp(),
            proptest::option::of(arb_category()),
        )
            .prop_map(
                |(id, title, description, source_name, author, published_at, category)| Article {
                    url: format!("https://news.example.com/{}", id),
                    image_url: None,
                    content: None,
                    id,
                    title,
                    description,
                    source_name,
                    author,
                    published_at,
                    category,
                },
            )
    }

    pub fn arb_listing() -> impl Strategy<Value = Vec<Article>> {
        proptest::collection::vec(arb_article(), 0..8)
    }

    pub fn arb_cache_key() -> impl Strategy<Value = CacheKey> {
        prop_oneof![
            (arb_component(), arb_component())
                .prop_map(|(l, c)| CacheKey::breaking_news(l, c)),
            (arb_component(), arb_component(), 1u32..50)
                .prop_map(|(l, c, p)| CacheKey::top_headlines(l, c, p)),
            (arb_component(), arb_category(), arb_component(), 1u32..50)
                .prop_map(|(l, cat, c, p)| CacheKey::category_headlines(l, cat, c, p)),
            arb_component().prop_map(|id| CacheKey::article(id)),
        ]
    }

    pub fn arb_key_kind() -> impl Strategy<Value = KeyKind> {
        proptest::sample::select(KeyKind::ALL.to_vec())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made values for common scenarios.

    use super::*;

    pub fn sample_article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Headline {}", id),
            description: Some(format!("Summary of {}", id)),
            url: format!("https://news.example.com/{}", id),
            source_name: "Example Wire".to_string(),
            author: Some("Staff Reporter".to_string()),
            image_url: None,
            published_at: Utc::now(),
            content: None,
            category: None,
        }
    }

    pub fn sample_listing(prefix: &str, len: usize) -> Vec<Article> {
        (0..len)
            .map(|n| sample_article(&format!("{}-{}", prefix, n)))
            .collect()
    }

    /// A timestamp that is already `ttl` plus one second in the past.
    pub fn expired_timestamp(ttl: Duration) -> Timestamp {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Utc::now() - ttl - chrono::Duration::seconds(1)
    }

    /// One key of every kind.
    pub fn one_key_per_kind() -> Vec<CacheKey> {
        vec![
            CacheKey::breaking_news("en", "us"),
            CacheKey::top_headlines("en", "us", 1),
            CacheKey::category_headlines("en", Category::Technology, "us", 1),
            CacheKey::article("article-1"),
        ]
    }

    /// A config whose TTLs are all `ttl`, with promotion off and no disk.
    pub fn uniform_ttl_config(ttl: Duration) -> CacheConfig {
        CacheConfig::default().with_ttl_policy(TtlPolicy::with_only_fallback(ttl))
    }

    /// The source error the mock returns when told to fail.
    pub fn transport_error() -> FeedError {
        SourceError::Transport {
            reason: "connection reset".to_string(),
        }
        .into()
    }
}
