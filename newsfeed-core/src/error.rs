//! Error types for newsfeed operations

use std::time::Duration;
use thiserror::Error;

/// Failures reported by a remote news source.
///
/// These are the only errors a caching layer ever hands back to its callers;
/// cache-internal problems are absorbed before they get this far.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Request to {source_name} failed with status {status}: {message}")]
    RequestFailed {
        source_name: String,
        status: u16,
        message: String,
    },

    #[error("Rate limited by {source_name}, retry after {retry_after:?}")]
    RateLimited {
        source_name: String,
        retry_after: Duration,
    },

    #[error("Invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },

    #[error("Article not found: {id}")]
    ArticleNotFound { id: String },

    #[error("Transport error: {reason}")]
    Transport { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("TTL ordering violated: {shorter} ({shorter_ttl:?}) must be shorter than {longer} ({longer_ttl:?})")]
    TtlOrdering {
        shorter: String,
        shorter_ttl: Duration,
        longer: String,
        longer_ttl: Duration,
    },
}

/// Master error type for all newsfeed errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for newsfeed operations.
pub type FeedResult<T> = Result<T, FeedError>;

// =============================================================================
// TESTS
// =============================================================================
