//! Newsfeed Core - Content Types
//!
//! Plain data structures shared by the cache and its collaborators:
//! the `Article` payload, headline categories, and the error taxonomy.
//! This crate contains ONLY data types - no caching policy.

mod article;
mod error;

pub use article::{Article, Category, Timestamp};
pub use error::{ConfigError, FeedError, FeedResult, SourceError};
