//! Default values and environment variable names for cache configuration.

// ============================================================================
// TTL DEFAULTS
// ============================================================================

/// Breaking news goes stale fastest.
pub const DEFAULT_BREAKING_NEWS_TTL_SECS: u64 = 5 * 60;

/// First page of top headlines.
pub const DEFAULT_HEADLINES_FIRST_PAGE_TTL_SECS: u64 = 15 * 60;

/// Second and later pages of top headlines.
pub const DEFAULT_HEADLINES_LATER_PAGES_TTL_SECS: u64 = 60 * 60;

/// Category headlines, any page.
pub const DEFAULT_CATEGORY_HEADLINES_TTL_SECS: u64 = 30 * 60;

/// Individually addressed articles do not change once published.
pub const DEFAULT_ARTICLE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Used for any TTL class without an explicit value.
pub const DEFAULT_FALLBACK_TTL_SECS: u64 = 30 * 60;

/// Page numbers at or below this are treated as the first page.
pub const FIRST_PAGE: u32 = 1;

// ============================================================================
// DURABLE TIER
// ============================================================================

/// Extension of committed record files.
pub const RECORD_EXTENSION: &str = "json";

/// Prefix of in-flight temp files; never read back as records.
pub const TEMP_FILE_PREFIX: &str = ".tmp-";

/// Prefix of record names derived from a key digest.
pub const HASHED_RECORD_PREFIX: &str = "h-";

/// Encoded keys longer than this are stored under their SHA-256 digest
/// to stay within common filename limits.
pub const MAX_RECORD_STEM_LEN: usize = 200;

/// Record format version written into every durable record.
pub const DISK_RECORD_VERSION: u32 = 1;

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

pub const ENV_TTL_BREAKING_NEWS_SECS: &str = "NEWSFEED_CACHE_TTL_BREAKING_NEWS_SECS";
pub const ENV_TTL_HEADLINES_FIRST_PAGE_SECS: &str = "NEWSFEED_CACHE_TTL_HEADLINES_FIRST_PAGE_SECS";
pub const ENV_TTL_HEADLINES_LATER_PAGES_SECS: &str =
    "NEWSFEED_CACHE_TTL_HEADLINES_LATER_PAGES_SECS";
pub const ENV_TTL_CATEGORY_HEADLINES_SECS: &str = "NEWSFEED_CACHE_TTL_CATEGORY_HEADLINES_SECS";
pub const ENV_TTL_ARTICLE_SECS: &str = "NEWSFEED_CACHE_TTL_ARTICLE_SECS";
pub const ENV_TTL_FALLBACK_SECS: &str = "NEWSFEED_CACHE_TTL_FALLBACK_SECS";
pub const ENV_CACHE_DIR: &str = "NEWSFEED_CACHE_DIR";
pub const ENV_PERSIST_KINDS: &str = "NEWSFEED_CACHE_PERSIST_KINDS";
pub const ENV_PROMOTE_DURABLE_HITS: &str = "NEWSFEED_CACHE_PROMOTE_DURABLE_HITS";
