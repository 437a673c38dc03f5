//! Data shapes of the wrapped cache store
//!
//! These types describe entries as the external backend hands them back.
//! The instrumentation layer reads them to assemble telemetry attributes but
//! never mutates entry content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel the wrapped service uses for entries that never expire.
///
/// Telemetry encodes permanent entries with this value so dashboards can
/// distinguish them from timed ones.
pub const CACHE_PERMANENT: i64 = -1;

/// Expiration of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiration {
    /// The entry never expires
    Permanent,
    /// The entry expires at the given wall-clock time
    At(DateTime<Utc>),
}

impl Expiration {
    /// Encode the expiration the way the wire/telemetry format expects:
    /// unix seconds, or [`CACHE_PERMANENT`] for permanent entries.
    pub fn as_epoch_seconds(&self) -> i64 {
        match self {
            Self::Permanent => CACHE_PERMANENT,
            Self::At(when) => when.timestamp(),
        }
    }

    /// Whether the entry is past its expiration at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Permanent => false,
            Self::At(when) => *when <= now,
        }
    }
}

/// A single entry as returned by a [`CacheBackend`](crate::CacheBackend).
///
/// Owned and mutated exclusively by the backend; this layer only observes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache id of the entry within its bin
    pub cid: String,

    /// Opaque payload; the instrumentation layer never inspects it
    pub payload: Value,

    /// Expiration timestamp or permanent marker
    pub expire: Expiration,

    /// Invalidation tags attached to the entry
    pub tags: Vec<String>,

    /// Cleared when the entry is invalidated; invalid entries are only
    /// returned to readers that opt into `allow_invalid`
    pub valid: bool,

    /// When the entry was written
    pub created: DateTime<Utc>,
}

impl CacheEntry {
    /// Tags joined with a single space, the format telemetry attributes use.
    pub fn joined_tags(&self) -> String {
        self.tags.join(" ")
    }
}

/// Write-side shape accepted by `set_multiple`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheItem {
    /// Cache id to write under
    pub cid: String,
    /// Payload to store
    pub payload: Value,
    /// Expiration for the new entry
    pub expire: Expiration,
    /// Invalidation tags for the new entry
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    //! Unit tests for entry types.
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    /// Validates `Expiration::as_epoch_seconds` for both variants.
    ///
    /// Assertions:
    /// - Confirms `Permanent` encodes as `CACHE_PERMANENT`.
    /// - Confirms `At` encodes as the unix timestamp.
    #[test]
    fn test_expiration_epoch_encoding() {
        assert_eq!(Expiration::Permanent.as_epoch_seconds(), CACHE_PERMANENT);

        let when = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap();
        assert_eq!(Expiration::At(when).as_epoch_seconds(), when.timestamp());
    }

    /// Validates `Expiration::is_expired` boundary behavior.
    ///
    /// Assertions:
    /// - Ensures `Permanent` never expires.
    /// - Ensures a timestamp equal to `now` counts as expired.
    /// - Ensures a future timestamp is not expired.
    #[test]
    fn test_expiration_is_expired() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap();

        assert!(!Expiration::Permanent.is_expired(now));
        assert!(Expiration::At(now).is_expired(now));
        assert!(!Expiration::At(now + chrono::Duration::seconds(1)).is_expired(now));
    }

    /// Validates `CacheEntry::joined_tags` formatting.
    ///
    /// Assertions:
    /// - Confirms tags are joined with a single space.
    /// - Confirms an empty tag list joins to an empty string.
    #[test]
    fn test_joined_tags() {
        let mut entry = CacheEntry {
            cid: "render:front".to_string(),
            payload: json!({"markup": "<p>hi</p>"}),
            expire: Expiration::Permanent,
            tags: vec!["node:1".to_string(), "node_list".to_string()],
            valid: true,
            created: Utc::now(),
        };
        assert_eq!(entry.joined_tags(), "node:1 node_list");

        entry.tags.clear();
        assert_eq!(entry.joined_tags(), "");
    }
}
