//! Time-to-live policy per content class.
//!
//! The policy is an explicit value handed to the caching layer at
//! construction time. Each key maps to exactly one [`TtlClass`]; classes
//! without a configured value use the fallback TTL.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use newsfeed_core::ConfigError;
use tracing::warn;

use super::key::CacheKey;
use crate::constants::{
    DEFAULT_ARTICLE_TTL_SECS, DEFAULT_BREAKING_NEWS_TTL_SECS, DEFAULT_CATEGORY_HEADLINES_TTL_SECS,
    DEFAULT_FALLBACK_TTL_SECS, DEFAULT_HEADLINES_FIRST_PAGE_TTL_SECS,
    DEFAULT_HEADLINES_LATER_PAGES_TTL_SECS, ENV_TTL_ARTICLE_SECS, ENV_TTL_BREAKING_NEWS_SECS,
    ENV_TTL_CATEGORY_HEADLINES_SECS, ENV_TTL_FALLBACK_SECS, ENV_TTL_HEADLINES_FIRST_PAGE_SECS,
    ENV_TTL_HEADLINES_LATER_PAGES_SECS, FIRST_PAGE,
};

/// Content classes that may carry distinct TTLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TtlClass {
    BreakingNews,
    HeadlinesFirstPage,
    HeadlinesLaterPages,
    CategoryHeadlines,
    Article,
}

impl TtlClass {
    pub const ALL: [TtlClass; 5] = [
        TtlClass::BreakingNews,
        TtlClass::HeadlinesFirstPage,
        TtlClass::HeadlinesLaterPages,
        TtlClass::CategoryHeadlines,
        TtlClass::Article,
    ];

    /// Classify a key.
    pub fn of(key: &CacheKey) -> Self {
        match key {
            CacheKey::BreakingNews { .. } => TtlClass::BreakingNews,
            CacheKey::TopHeadlines { page, .. } if *page <= FIRST_PAGE => {
                TtlClass::HeadlinesFirstPage
            }
            CacheKey::TopHeadlines { .. } => TtlClass::HeadlinesLaterPages,
            CacheKey::CategoryHeadlines { .. } => TtlClass::CategoryHeadlines,
            CacheKey::Article { .. } => TtlClass::Article,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TtlClass::BreakingNews => "breaking_news",
            TtlClass::HeadlinesFirstPage => "headlines_first_page",
            TtlClass::HeadlinesLaterPages => "headlines_later_pages",
            TtlClass::CategoryHeadlines => "category_headlines",
            TtlClass::Article => "article",
        }
    }

    fn env_var(&self) -> &'static str {
        match self {
            TtlClass::BreakingNews => ENV_TTL_BREAKING_NEWS_SECS,
            TtlClass::HeadlinesFirstPage => ENV_TTL_HEADLINES_FIRST_PAGE_SECS,
            TtlClass::HeadlinesLaterPages => ENV_TTL_HEADLINES_LATER_PAGES_SECS,
            TtlClass::CategoryHeadlines => ENV_TTL_CATEGORY_HEADLINES_SECS,
            TtlClass::Article => ENV_TTL_ARTICLE_SECS,
        }
    }

    fn default_secs(&self) -> u64 {
        match self {
            TtlClass::BreakingNews => DEFAULT_BREAKING_NEWS_TTL_SECS,
            TtlClass::HeadlinesFirstPage => DEFAULT_HEADLINES_FIRST_PAGE_TTL_SECS,
            TtlClass::HeadlinesLaterPages => DEFAULT_HEADLINES_LATER_PAGES_TTL_SECS,
            TtlClass::CategoryHeadlines => DEFAULT_CATEGORY_HEADLINES_TTL_SECS,
            TtlClass::Article => DEFAULT_ARTICLE_TTL_SECS,
        }
    }
}

impl fmt::Display for TtlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pairs that must be strictly ordered, shorter first.
const ORDERING: [(TtlClass, TtlClass); 4] = [
    (TtlClass::BreakingNews, TtlClass::HeadlinesFirstPage),
    (TtlClass::HeadlinesFirstPage, TtlClass::HeadlinesLaterPages),
    (TtlClass::HeadlinesLaterPages, TtlClass::Article),
    (TtlClass::CategoryHeadlines, TtlClass::Article),
];

/// TTL table keyed by content class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    fallback: Duration,
    ttls: BTreeMap<TtlClass, Duration>,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        let ttls = TtlClass::ALL
            .into_iter()
            .map(|class| (class, Duration::from_secs(class.default_secs())))
            .collect();
        Self {
            fallback: Duration::from_secs(DEFAULT_FALLBACK_TTL_SECS),
            ttls,
        }
    }
}

impl TtlPolicy {
    /// A policy with no per-class values; every key uses `fallback`.
    pub fn with_only_fallback(fallback: Duration) -> Self {
        Self {
            fallback,
            ttls: BTreeMap::new(),
        }
    }

    /// Set the TTL for one class.
    pub fn with_ttl(mut self, class: TtlClass, ttl: Duration) -> Self {
        self.ttls.insert(class, ttl);
        self
    }

    /// Drop the per-class value so the class uses the fallback.
    pub fn without_ttl(mut self, class: TtlClass) -> Self {
        self.ttls.remove(&class);
        self
    }

    /// Set the fallback TTL.
    pub fn with_fallback(mut self, ttl: Duration) -> Self {
        self.fallback = ttl;
        self
    }

    pub fn fallback(&self) -> Duration {
        self.fallback
    }

    /// Effective TTL for a class.
    pub fn ttl_for_class(&self, class: TtlClass) -> Duration {
        self.ttls.get(&class).copied().unwrap_or(self.fallback)
    }

    /// Effective TTL for a key.
    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        self.ttl_for_class(TtlClass::of(key))
    }

    /// Check that every TTL is positive and the class ordering holds:
    /// breaking < first page < later pages < article, and category < article.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "fallback".to_string(),
                value: "0s".to_string(),
                reason: "TTL must be positive".to_string(),
            });
        }

        for class in TtlClass::ALL {
            let ttl = self.ttl_for_class(class);
            if ttl.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: class.as_str().to_string(),
                    value: format!("{:?}", ttl),
                    reason: "TTL must be positive".to_string(),
                });
            }
        }

        for (shorter, longer) in ORDERING {
            let shorter_ttl = self.ttl_for_class(shorter);
            let longer_ttl = self.ttl_for_class(longer);
            if shorter_ttl >= longer_ttl {
                return Err(ConfigError::TtlOrdering {
                    shorter: shorter.as_str().to_string(),
                    shorter_ttl,
                    longer: longer.as_str().to_string(),
                    longer_ttl,
                });
            }
        }

        Ok(())
    }

    /// Build a validated policy from environment variables.
    ///
    /// Environment variables (seconds):
    /// - `NEWSFEED_CACHE_TTL_BREAKING_NEWS_SECS` (default: 300)
    /// - `NEWSFEED_CACHE_TTL_HEADLINES_FIRST_PAGE_SECS` (default: 900)
    /// - `NEWSFEED_CACHE_TTL_HEADLINES_LATER_PAGES_SECS` (default: 3600)
    /// - `NEWSFEED_CACHE_TTL_CATEGORY_HEADLINES_SECS` (default: 1800)
    /// - `NEWSFEED_CACHE_TTL_ARTICLE_SECS` (default: 604800)
    /// - `NEWSFEED_CACHE_TTL_FALLBACK_SECS` (default: 1800)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`TtlPolicy::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policy = Self::default();
        if let Some(fallback) = read_secs(&lookup, ENV_TTL_FALLBACK_SECS) {
            policy.fallback = fallback;
        }
        for class in TtlClass::ALL {
            if let Some(ttl) = read_secs(&lookup, class.env_var()) {
                policy.ttls.insert(class, ttl);
            }
        }
        policy.validate()?;
        Ok(policy)
    }
}

/// Unset or unparseable values are ignored so the default applies.
fn read_secs<F>(lookup: &F, name: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!(var = name, value = %raw, error = %e, "Ignoring unparseable TTL override");
            None
        }
    }
}
