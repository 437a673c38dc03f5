//! In-memory test doubles for the collaborator traits
//!
//! The production backend, factory, sink and logger all live in the host;
//! these doubles exist so hosts (and this crate's own suites) can exercise
//! the instrumentation wiring without one. [`MemoryBackend`] honours the
//! wrapped service's contracts, including draining found ids from the
//! `get_multiple` id list and hiding invalid or expired entries from
//! readers that did not opt into `allow_invalid`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use serde_json::Value;

use crate::backend::{CacheBackend, CacheFactory, CacheTagsInvalidator};
use crate::entry::{CacheEntry, CacheItem, Expiration};
use crate::error::{CacheError, CacheResult, LogError, TelemetryError, TelemetryResult};
use crate::logger::Logger;
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::time::MockClock;

/// HashMap-backed [`CacheBackend`] with optional failure injection.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: RwLock<HashMap<String, CacheEntry>>,
    invalidated: RwLock<Vec<String>>,
    supports_tags: bool,
    fail_storage: AtomicBool,
    read_delay: Option<(MockClock, u64)>,
}

impl MemoryBackend {
    /// Create an empty backend with tag-invalidation support
    pub fn new() -> Self {
        Self { supports_tags: true, ..Self::default() }
    }

    /// Create an empty backend without the tag-invalidation capability
    pub fn without_tag_support() -> Self {
        Self::default()
    }

    /// Advance `clock` by `millis` on every `get`, simulating read latency
    pub fn with_read_delay(mut self, clock: MockClock, millis: u64) -> Self {
        self.read_delay = Some((clock, millis));
        self
    }

    /// Make every subsequent operation fail with a storage error
    pub fn fail_storage(&self, fail: bool) {
        self.fail_storage.store(fail, Ordering::SeqCst);
    }

    /// Tags this backend has been asked to invalidate, in call order
    pub fn invalidated_tags(&self) -> Vec<String> {
        self.invalidated.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Raw peek at an entry, bypassing validity and expiration checks
    pub fn peek(&self, cid: &str) -> Option<CacheEntry> {
        self.store.read().unwrap_or_else(PoisonError::into_inner).get(cid).cloned()
    }

    /// Number of stored entries, valid or not
    pub fn len(&self) -> usize {
        self.store.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the backend holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_storage(&self) -> CacheResult<()> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(CacheError::Storage("simulated storage failure".to_string()));
        }
        Ok(())
    }

    fn visible(entry: &CacheEntry, allow_invalid: bool) -> bool {
        allow_invalid || (entry.valid && !entry.expire.is_expired(Utc::now()))
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, cid: &str, allow_invalid: bool) -> CacheResult<Option<CacheEntry>> {
        self.check_storage()?;
        if let Some((clock, millis)) = &self.read_delay {
            clock.advance_millis(*millis);
        }
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        Ok(store.get(cid).filter(|entry| Self::visible(entry, allow_invalid)).cloned())
    }

    fn get_multiple(
        &self,
        cids: &mut Vec<String>,
        allow_invalid: bool,
    ) -> CacheResult<HashMap<String, CacheEntry>> {
        self.check_storage()?;
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let mut hits = HashMap::new();
        // Drain found ids: on return `cids` holds exactly the misses.
        cids.retain(|cid| match store.get(cid) {
            Some(entry) if Self::visible(entry, allow_invalid) => {
                hits.insert(cid.clone(), entry.clone());
                false
            }
            _ => true,
        });
        Ok(hits)
    }

    fn set(
        &self,
        cid: &str,
        payload: Value,
        expire: Expiration,
        tags: &[String],
    ) -> CacheResult<()> {
        self.check_storage()?;
        let entry = CacheEntry {
            cid: cid.to_string(),
            payload,
            expire,
            tags: tags.to_vec(),
            valid: true,
            created: Utc::now(),
        };
        self.store.write().unwrap_or_else(PoisonError::into_inner).insert(cid.to_string(), entry);
        Ok(())
    }

    fn set_multiple(&self, items: Vec<CacheItem>) -> CacheResult<()> {
        for item in items {
            self.set(&item.cid, item.payload, item.expire, &item.tags)?;
        }
        Ok(())
    }

    fn delete(&self, cid: &str) -> CacheResult<()> {
        self.check_storage()?;
        self.store.write().unwrap_or_else(PoisonError::into_inner).remove(cid);
        Ok(())
    }

    fn delete_multiple(&self, cids: &[String]) -> CacheResult<()> {
        self.check_storage()?;
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        for cid in cids {
            store.remove(cid);
        }
        Ok(())
    }

    fn delete_all(&self) -> CacheResult<()> {
        self.check_storage()?;
        self.store.write().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }

    fn invalidate(&self, cid: &str) -> CacheResult<()> {
        self.check_storage()?;
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = store.get_mut(cid) {
            entry.valid = false;
        }
        Ok(())
    }

    fn invalidate_multiple(&self, cids: &[String]) -> CacheResult<()> {
        for cid in cids {
            self.invalidate(cid)?;
        }
        Ok(())
    }

    fn invalidate_all(&self) -> CacheResult<()> {
        self.check_storage()?;
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        for entry in store.values_mut() {
            entry.valid = false;
        }
        Ok(())
    }

    fn garbage_collection(&self) -> CacheResult<()> {
        self.check_storage()?;
        let now = Utc::now();
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        store.retain(|_, entry| !entry.expire.is_expired(now));
        Ok(())
    }

    fn remove_bin(&self) -> CacheResult<()> {
        self.check_storage()?;
        self.store.write().unwrap_or_else(PoisonError::into_inner).clear();
        Ok(())
    }

    fn as_tag_invalidator(&self) -> Option<&dyn CacheTagsInvalidator> {
        if self.supports_tags {
            Some(self)
        } else {
            None
        }
    }
}

impl CacheTagsInvalidator for MemoryBackend {
    fn invalidate_tags(&self, tags: &[String]) -> CacheResult<()> {
        self.check_storage()?;
        self.invalidated.write().unwrap_or_else(PoisonError::into_inner).extend_from_slice(tags);
        let mut store = self.store.write().unwrap_or_else(PoisonError::into_inner);
        for entry in store.values_mut() {
            if entry.tags.iter().any(|tag| tags.contains(tag)) {
                entry.valid = false;
            }
        }
        Ok(())
    }
}

/// [`CacheFactory`] handing out one shared [`MemoryBackend`] per bin.
#[derive(Debug, Default)]
pub struct MemoryCacheFactory {
    bins: RwLock<HashMap<String, Arc<MemoryBackend>>>,
}

impl MemoryCacheFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the shared backend for `bin`.
    ///
    /// Tests use this to seed entries behind whatever handle the code under
    /// test obtained for the same bin.
    pub fn backend(&self, bin: &str) -> Arc<MemoryBackend> {
        let mut bins = self.bins.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(bins.entry(bin.to_string()).or_insert_with(|| Arc::new(MemoryBackend::new())))
    }

    /// Bin names created so far
    pub fn bins(&self) -> Vec<String> {
        self.bins.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }
}

impl CacheFactory for MemoryCacheFactory {
    fn get(&self, bin: &str) -> CacheResult<Arc<dyn CacheBackend>> {
        Ok(self.backend(bin) as Arc<dyn CacheBackend>)
    }
}

/// [`TelemetrySink`] that stores events for later assertions.
///
/// Availability and send failures can be toggled to exercise the
/// best-effort paths.
#[derive(Debug)]
pub struct RecordingSink {
    events: Mutex<Vec<TelemetryEvent>>,
    available: AtomicBool,
    fail_sends: AtomicBool,
}

impl RecordingSink {
    /// Create an available, non-failing sink
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// Snapshot of every recorded event, in emission order
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded events of one type
    pub fn events_named(&self, name: &str) -> Vec<TelemetryEvent> {
        self.events().into_iter().filter(|event| event.name == name).collect()
    }

    /// Toggle the capability check
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make every subsequent `record_event` fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for RecordingSink {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn record_event(&self, event: TelemetryEvent) -> TelemetryResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TelemetryError::Rejected("simulated sink failure".to_string()));
        }
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        Ok(())
    }
}

/// [`Logger`] that collects lines and can simulate sink teardown.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    lines: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
}

impl CollectingLogger {
    /// Create an empty logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of collected lines
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Make every subsequent write fail, as if the backing storage were
    /// being removed
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn write(&self, message: &str) -> Result<(), LogError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LogError::SinkClosed("simulated log sink teardown".to_string()));
        }
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).push(message.to_string());
        Ok(())
    }
}

impl Logger for CollectingLogger {
    fn debug(&self, message: &str) -> Result<(), LogError> {
        self.write(message)
    }

    fn warning(&self, message: &str) -> Result<(), LogError> {
        self.write(message)
    }
}
