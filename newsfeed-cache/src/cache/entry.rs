//! Timestamped cache entries.
//!
//! An entry pairs a payload with the moment it was fetched. Entries are
//! immutable: a store replaces them wholesale on every write and expiry is a
//! pure function of the fetch time, the current time and a caller-supplied TTL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A payload and the time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    data: T,
    timestamp: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Create an entry with an explicit fetch time.
    pub fn new(data: T, timestamp: DateTime<Utc>) -> Self {
        Self { data, timestamp }
    }

    /// Create an entry stamped with the current time.
    pub fn fresh(data: T) -> Self {
        Self::new(data, Utc::now())
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    /// When the payload was fetched.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Age of the entry at `now`. Zero if the timestamp lies in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// True iff `now - timestamp >= ttl`.
    ///
    /// The boundary is inclusive: an entry exactly `ttl` old is expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.timestamp) >= ttl,
            // A TTL too large for chrono never elapses.
            Err(_) => false,
        }
    }

    /// Expiry check against the current time.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.is_expired_at(Utc::now(), ttl)
    }

    /// Map the payload, keeping the timestamp.
    pub fn map<U, F>(self, f: F) -> CacheEntry<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheEntry {
            data: f(self.data),
            timestamp: self.timestamp,
        }
    }

    /// Fallible variant of [`CacheEntry::map`].
    pub fn and_then<U, F>(self, f: F) -> Option<CacheEntry<U>>
    where
        F: FnOnce(T) -> Option<U>,
    {
        let timestamp = self.timestamp;
        f(self.data).map(|data| CacheEntry { data, timestamp })
    }
}
