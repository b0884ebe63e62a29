//! Invalidation across both tiers.
//!
//! Covers:
//! - Full invalidation empties every tier, including on-disk records
//! - Selective invalidation removes exactly the named keys
//! - Fresh-content invalidation removes listings and keeps single articles
//! - Kind invalidation removes one kind only

use std::sync::Arc;

use newsfeed_test_utils::fixtures::one_key_per_kind;
use newsfeed_test_utils::{
    init_tracing, CacheConfig, CacheKey, CacheStore, CachingNewsSource, Category, KeyKind,
    MockNewsSource, NewsSource,
};
use tempfile::TempDir;

type Cache = CachingNewsSource<Arc<MockNewsSource>>;

async fn populated_cache(dir: &TempDir) -> (Cache, Arc<MockNewsSource>) {
    init_tracing();
    let source = Arc::new(MockNewsSource::new());
    let config = CacheConfig::default().with_durable_dir(dir.path());
    let cache = CachingNewsSource::open(source.clone(), config)
        .await
        .expect("durable tier should open");

    cache.breaking_news("en", "us").await.unwrap();
    cache.top_headlines("en", "us", 1).await.unwrap();
    cache
        .category_headlines("en", Category::Technology, "us", 1)
        .await
        .unwrap();
    cache.article("article-1").await.unwrap();
    source.reset_calls();
    (cache, source)
}

async fn present_in_any_tier(cache: &Cache, key: &CacheKey) -> bool {
    let mut present = cache.primary().get(key).await.is_some();
    if let Some(durable) = cache.durable() {
        present |= durable.get(key).await.is_some();
    }
    present
}

#[tokio::test]
async fn test_invalidate_all_empties_every_tier() {
    let dir = TempDir::new().unwrap();
    let (cache, source) = populated_cache(&dir).await;

    let removed = cache.invalidate_all().await;

    assert_eq!(removed, 8);
    assert!(cache.primary().is_empty().await);
    assert!(cache.durable().unwrap().is_empty().await);

    cache.article("article-1").await.unwrap();
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_invalidate_all_reaches_records_from_previous_run() {
    let dir = TempDir::new().unwrap();
    let (cache, _source) = populated_cache(&dir).await;
    drop(cache);

    let source = Arc::new(MockNewsSource::new());
    let config = CacheConfig::default().with_durable_dir(dir.path());
    let restarted = CachingNewsSource::open(source.clone(), config).await.unwrap();
    assert_eq!(restarted.invalidate_all().await, 4);

    restarted.breaking_news("en", "us").await.unwrap();
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_invalidate_keys_removes_exactly_those_keys() {
    let dir = TempDir::new().unwrap();
    let (cache, source) = populated_cache(&dir).await;
    let target = CacheKey::top_headlines("en", "us", 1);

    cache.invalidate_keys(std::slice::from_ref(&target)).await;

    assert!(!present_in_any_tier(&cache, &target).await);
    for key in one_key_per_kind().iter().filter(|k| **k != target) {
        assert!(present_in_any_tier(&cache, key).await, "{} was removed", key);
    }

    cache.top_headlines("en", "us", 1).await.unwrap();
    cache.breaking_news("en", "us").await.unwrap();
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_invalidate_keys_empty_or_unknown_is_noop() {
    let dir = TempDir::new().unwrap();
    let (cache, _source) = populated_cache(&dir).await;

    cache.invalidate_keys(&[]).await;
    cache
        .invalidate_keys(&[CacheKey::article("never-cached")])
        .await;

    assert_eq!(cache.primary().len().await, 4);
    assert_eq!(cache.durable().unwrap().len().await, 4);
}

#[tokio::test]
async fn test_invalidate_key_matches_parameters_exactly() {
    let dir = TempDir::new().unwrap();
    let (cache, _source) = populated_cache(&dir).await;

    // Same kind, different page: nothing removed.
    cache
        .invalidate_key(&CacheKey::top_headlines("en", "us", 2))
        .await;

    assert_eq!(cache.primary().len().await, 4);
}

#[tokio::test]
async fn test_invalidate_fresh_content_keeps_articles() {
    let dir = TempDir::new().unwrap();
    let (cache, source) = populated_cache(&dir).await;

    let removed = cache.invalidate_fresh_content().await;

    assert_eq!(removed, 6);
    for key in one_key_per_kind() {
        let expected = !key.kind().is_listing();
        assert_eq!(present_in_any_tier(&cache, &key).await, expected, "{}", key);
    }

    cache.article("article-1").await.unwrap();
    assert_eq!(source.call_count(), 0);
    cache.breaking_news("en", "us").await.unwrap();
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_invalidate_fresh_content_on_empty_cache() {
    let cache = CachingNewsSource::in_memory(MockNewsSource::new(), CacheConfig::default());
    assert_eq!(cache.invalidate_fresh_content().await, 0);
}

#[tokio::test]
async fn test_invalidate_kind_removes_one_kind() {
    let dir = TempDir::new().unwrap();
    let (cache, _source) = populated_cache(&dir).await;
    cache.top_headlines("en", "us", 2).await.unwrap();

    let removed = cache.invalidate_kind(KeyKind::TopHeadlines).await;

    assert_eq!(removed, 4);
    assert_eq!(cache.primary().len().await, 3);
    assert!(
        present_in_any_tier(&cache, &CacheKey::breaking_news("en", "us")).await
    );
}
