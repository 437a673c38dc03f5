//! Collaborator traits for the wrapped cache service
//!
//! These traits describe the external key-value store this crate decorates.
//! No implementation ships here beyond the in-memory doubles in
//! [`testing`](crate::testing); production backends live in the host.
//!
//! Tag invalidation is an optional capability: backends that support it
//! expose a [`CacheTagsInvalidator`] through
//! [`CacheBackend::as_tag_invalidator`]. This replaces downcast-style
//! instance checks with an explicit runtime capability query.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::entry::{CacheEntry, CacheItem, Expiration};
use crate::error::CacheResult;

/// A key-value cache bound to one bin (namespace).
pub trait CacheBackend: Send + Sync {
    /// Read one entry. Invalid or expired entries are only returned when
    /// `allow_invalid` is set.
    fn get(&self, cid: &str, allow_invalid: bool) -> CacheResult<Option<CacheEntry>>;

    /// Read several entries at once.
    ///
    /// Contract of the wrapped service: found ids are drained from `cids`,
    /// so on return the vector holds exactly the misses. The returned map
    /// holds the hits.
    fn get_multiple(
        &self,
        cids: &mut Vec<String>,
        allow_invalid: bool,
    ) -> CacheResult<HashMap<String, CacheEntry>>;

    /// Create or overwrite one entry
    fn set(&self, cid: &str, payload: Value, expire: Expiration, tags: &[String])
        -> CacheResult<()>;

    /// Create or overwrite several entries
    fn set_multiple(&self, items: Vec<CacheItem>) -> CacheResult<()>;

    /// Remove one entry
    fn delete(&self, cid: &str) -> CacheResult<()>;

    /// Remove several entries
    fn delete_multiple(&self, cids: &[String]) -> CacheResult<()>;

    /// Remove every entry in the bin
    fn delete_all(&self) -> CacheResult<()>;

    /// Mark one entry invalid (still readable with `allow_invalid`)
    fn invalidate(&self, cid: &str) -> CacheResult<()>;

    /// Mark several entries invalid
    fn invalidate_multiple(&self, cids: &[String]) -> CacheResult<()>;

    /// Mark every entry in the bin invalid
    fn invalidate_all(&self) -> CacheResult<()>;

    /// Remove expired entries
    fn garbage_collection(&self) -> CacheResult<()>;

    /// Remove the bin itself
    fn remove_bin(&self) -> CacheResult<()>;

    /// Tag-invalidation capability, when the backend supports it
    fn as_tag_invalidator(&self) -> Option<&dyn CacheTagsInvalidator> {
        None
    }
}

/// Capability of invalidating entries by tag, across ids.
pub trait CacheTagsInvalidator: Send + Sync {
    /// Mark every entry carrying any of `tags` invalid
    fn invalidate_tags(&self, tags: &[String]) -> CacheResult<()>;
}

/// Produces one [`CacheBackend`] per bin name.
pub trait CacheFactory: Send + Sync {
    /// Get the backend for `bin`
    fn get(&self, bin: &str) -> CacheResult<Arc<dyn CacheBackend>>;
}
