//! Remote news source capability.

use async_trait::async_trait;
use newsfeed_core::{Article, Category, FeedResult};

/// Fetches content from a remote news source.
///
/// Implementations own transport, authentication and timeouts. The caching
/// layer wraps one of these and exposes the same trait to its own callers,
/// so caching is transparent.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// One page of top headlines for a country, in source order.
    async fn top_headlines(
        &self,
        language: &str,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>>;

    /// Current breaking news for a country, in source order.
    async fn breaking_news(&self, language: &str, country: &str) -> FeedResult<Vec<Article>>;

    /// One page of headlines within a category, in source order.
    async fn category_headlines(
        &self,
        language: &str,
        category: Category,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>>;

    /// A single article by identifier.
    async fn article(&self, id: &str) -> FeedResult<Article>;
}

#[async_trait]
impl<T> NewsSource for std::sync::Arc<T>
where
    T: NewsSource + ?Sized,
{
    async fn top_headlines(
        &self,
        language: &str,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>> {
        (**self).top_headlines(language, country, page).await
    }

    async fn breaking_news(&self, language: &str, country: &str) -> FeedResult<Vec<Article>> {
        (**self).breaking_news(language, country).await
    }

    async fn category_headlines(
        &self,
        language: &str,
        category: Category,
        country: &str,
        page: u32,
    ) -> FeedResult<Vec<Article>> {
        (**self)
            .category_headlines(language, category, country, page)
            .await
    }

    async fn article(&self, id: &str) -> FeedResult<Article> {
        (**self).article(id).await
    }
}
