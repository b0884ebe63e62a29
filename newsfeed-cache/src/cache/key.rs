//! Cache keys identifying a request shape.
//!
//! A `CacheKey` is a closed set of variants, one per fetch operation. Each key
//! renders to a canonical string used for storage lookup. The encoding is
//! injective: components are percent-encoded before joining, so no component
//! can contain the separator and two keys share a canonical string only when
//! they are equal.

use std::fmt;
use std::str::FromStr;

use newsfeed_core::{Category, ConfigError};
use serde::{Deserialize, Serialize};

/// Separator between the tag and each encoded component.
const SEPARATOR: char = ':';

/// Identifies one cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheKey {
    /// Breaking news for a country.
    BreakingNews { language: String, country: String },
    /// One page of top headlines for a country.
    TopHeadlines {
        language: String,
        country: String,
        page: u32,
    },
    /// One page of headlines within a category.
    CategoryHeadlines {
        language: String,
        category: Category,
        country: String,
        page: u32,
    },
    /// A single article addressed by its source identifier.
    Article { id: String },
}

impl CacheKey {
    pub fn breaking_news(language: impl Into<String>, country: impl Into<String>) -> Self {
        Self::BreakingNews {
            language: language.into(),
            country: country.into(),
        }
    }

    pub fn top_headlines(
        language: impl Into<String>,
        country: impl Into<String>,
        page: u32,
    ) -> Self {
        Self::TopHeadlines {
            language: language.into(),
            country: country.into(),
            page,
        }
    }

    pub fn category_headlines(
        language: impl Into<String>,
        category: Category,
        country: impl Into<String>,
        page: u32,
    ) -> Self {
        Self::CategoryHeadlines {
            language: language.into(),
            category,
            country: country.into(),
            page,
        }
    }

    pub fn article(id: impl Into<String>) -> Self {
        Self::Article { id: id.into() }
    }

    /// The variant tag of this key.
    pub fn kind(&self) -> KeyKind {
        match self {
            Self::BreakingNews { .. } => KeyKind::BreakingNews,
            Self::TopHeadlines { .. } => KeyKind::TopHeadlines,
            Self::CategoryHeadlines { .. } => KeyKind::CategoryHeadlines,
            Self::Article { .. } => KeyKind::Article,
        }
    }

    /// Page number for paged listings, `None` otherwise.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::TopHeadlines { page, .. } | Self::CategoryHeadlines { page, .. } => Some(*page),
            Self::BreakingNews { .. } | Self::Article { .. } => None,
        }
    }

    /// Canonical storage identifier.
    ///
    /// Format: `tag:component:component...` with every component
    /// percent-encoded. The string may still contain characters that are
    /// illegal in some namespaces (e.g. `%`), so tiers with stricter naming
    /// rules must encode it further.
    pub fn canonical_key(&self) -> String {
        let tag = self.kind().as_str();
        match self {
            Self::BreakingNews { language, country } => {
                compose(tag, &[language.as_str(), country.as_str()])
            }
            Self::TopHeadlines {
                language,
                country,
                page,
            } => compose(
                tag,
                &[language.as_str(), country.as_str(), page.to_string().as_str()],
            ),
            Self::CategoryHeadlines {
                language,
                category,
                country,
                page,
            } => compose(
                tag,
                &[
                    language.as_str(),
                    category.as_str(),
                    country.as_str(),
                    page.to_string().as_str(),
                ],
            ),
            Self::Article { id } => compose(tag, &[id.as_str()]),
        }
    }
}

fn compose(tag: &str, components: &[&str]) -> String {
    let mut key = String::from(tag);
    for component in components {
        key.push(SEPARATOR);
        key.push_str(&urlencoding::encode(component));
    }
    key
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_key())
    }
}

/// The tag of a `CacheKey`, without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    BreakingNews,
    TopHeadlines,
    CategoryHeadlines,
    Article,
}

impl KeyKind {
    pub const ALL: [KeyKind; 4] = [
        KeyKind::BreakingNews,
        KeyKind::TopHeadlines,
        KeyKind::CategoryHeadlines,
        KeyKind::Article,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::BreakingNews => "breaking_news",
            KeyKind::TopHeadlines => "top_headlines",
            KeyKind::CategoryHeadlines => "category_headlines",
            KeyKind::Article => "article",
        }
    }

    /// Fresh/listing content: re-fetched as ordered collections and
    /// cleared by bulk freshness invalidation. Articles are not listings.
    pub fn is_listing(&self) -> bool {
        !matches!(self, KeyKind::Article)
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "key_kind".to_string(),
                value: s.to_string(),
                reason: "unknown key kind".to_string(),
            })
    }
}
