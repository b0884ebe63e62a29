//! Content entity types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// A single news item as returned by a remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Source-assigned identifier. Opaque; may contain any characters.
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source_name: String,
    pub author: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Timestamp,
    /// Full body, usually present only on single-item fetches.
    pub content: Option<String>,
    pub category: Option<Category>,
}

/// Headline category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Business,
    Entertainment,
    General,
    Health,
    Science,
    Sports,
    Technology,
}

impl Category {
    /// Every category, in a stable order.
    pub const ALL: [Category; 7] = [
        Category::Business,
        Category::Entertainment,
        Category::General,
        Category::Health,
        Category::Science,
        Category::Sports,
        Category::Technology,
    ];

    /// Stable lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Business => "business",
            Category::Entertainment => "entertainment",
            Category::General => "general",
            Category::Health => "health",
            Category::Science => "science",
            Category::Sports => "sports",
            Category::Technology => "technology",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "category".to_string(),
                value: s.to_string(),
                reason: "unknown category".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_category_from_str_case_insensitive() {
        assert_eq!("Sports".parse::<Category>().ok(), Some(Category::Sports));
        assert_eq!(" technology ".parse::<Category>().ok(), Some(Category::Technology));
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&Category::Health).unwrap();
        assert_eq!(json, "\"health\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::Health);
    }

    proptest! {
        #[test]
        fn prop_category_display_parses_back(idx in 0usize..Category::ALL.len()) {
            let category = Category::ALL[idx];
            prop_assert_eq!(category.to_string().parse::<Category>().ok(), Some(category));
        }
    }
}
