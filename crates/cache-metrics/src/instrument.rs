//! Instrumented cache backend decorator
//!
//! [`InstrumentedCacheBackend`] wraps one backend bound to one bin. Reads
//! are observed and emit one `CacheGet` event per requested id; every other
//! operation passes straight through with no telemetry and no
//! transformation. Backend errors propagate unchanged; sink failures are
//! logged at debug level and swallowed, so the cache result stays
//! authoritative no matter what the monitoring side does.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::backend::{CacheBackend, CacheTagsInvalidator};
use crate::context::RequestContext;
use crate::entry::{CacheEntry, CacheItem, Expiration};
use crate::error::CacheResult;
use crate::telemetry::{attribute, TelemetryEvent, TelemetrySink, CACHE_GET_EVENT};
use crate::time::{Clock, SystemClock};

/// Pass-through decorator that emits read telemetry for one bin.
pub struct InstrumentedCacheBackend {
    inner: Arc<dyn CacheBackend>,
    bin: String,
    sink: Arc<dyn TelemetrySink>,
    context: Arc<dyn RequestContext>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for InstrumentedCacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedCacheBackend").field("bin", &self.bin).finish_non_exhaustive()
    }
}

impl InstrumentedCacheBackend {
    /// Wrap `inner` for the given bin using the system clock
    pub fn new(
        inner: Arc<dyn CacheBackend>,
        bin: impl Into<String>,
        sink: Arc<dyn TelemetrySink>,
        context: Arc<dyn RequestContext>,
    ) -> Self {
        Self::with_clock(inner, bin, sink, context, Arc::new(SystemClock))
    }

    /// Wrap `inner` with a custom clock (useful for testing durations)
    pub fn with_clock(
        inner: Arc<dyn CacheBackend>,
        bin: impl Into<String>,
        sink: Arc<dyn TelemetrySink>,
        context: Arc<dyn RequestContext>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { inner, bin: bin.into(), sink, context, clock }
    }

    /// Name of the wrapped bin
    pub fn bin(&self) -> &str {
        &self.bin
    }

    /// Emit one `CacheGet` event for a requested id.
    ///
    /// `entry` carries the hit's expiration and tags; `duration_ms` is only
    /// known for single reads. Sink failures end here.
    fn record_read(
        &self,
        cid: &str,
        hit: bool,
        entry: Option<&CacheEntry>,
        duration_ms: Option<u64>,
        is_multiple: bool,
    ) {
        let mut event = TelemetryEvent::new(CACHE_GET_EVENT)
            .with_attribute(attribute::CID, cid)
            .with_attribute(attribute::BIN, self.bin.as_str())
            .with_attribute(attribute::HIT, i64::from(hit))
            .with_attribute(attribute::MISS, i64::from(!hit))
            .with_attribute(attribute::IS_MULTIPLE, is_multiple)
            .with_attribute(attribute::URI, self.context.current_path())
            .with_optional_attribute(attribute::DURATION, duration_ms)
            .with_optional_attribute(attribute::REQUEST_ID, self.context.correlation_id())
            .with_optional_attribute(attribute::UID, self.context.current_user());

        if let Some(entry) = entry {
            event = event
                .with_attribute(attribute::EXPIRE, entry.expire.as_epoch_seconds())
                .with_attribute(attribute::TAGS, entry.joined_tags());
        }

        if let Err(error) = self.sink.record_event(event) {
            tracing::debug!(bin = %self.bin, cid, %error, "cache read telemetry dropped");
        }
    }
}

impl CacheBackend for InstrumentedCacheBackend {
    fn get(&self, cid: &str, allow_invalid: bool) -> CacheResult<Option<CacheEntry>> {
        let started = self.clock.now();
        let entry = self.inner.get(cid, allow_invalid)?;
        let duration_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;

        self.record_read(cid, entry.is_some(), entry.as_ref(), Some(duration_ms), false);
        Ok(entry)
    }

    fn get_multiple(
        &self,
        cids: &mut Vec<String>,
        allow_invalid: bool,
    ) -> CacheResult<HashMap<String, CacheEntry>> {
        let requested = cids.clone();
        let entries = self.inner.get_multiple(cids, allow_invalid)?;

        // The backend drained found ids from `cids`; whatever remains is a
        // miss. One event per originally requested id, in input order.
        // Per-key duration is not attributable for a batch read.
        for cid in &requested {
            let hit = !cids.contains(cid);
            let entry = if hit { entries.get(cid) } else { None };
            self.record_read(cid, hit, entry, None, true);
        }

        Ok(entries)
    }

    fn set(
        &self,
        cid: &str,
        payload: Value,
        expire: Expiration,
        tags: &[String],
    ) -> CacheResult<()> {
        self.inner.set(cid, payload, expire, tags)
    }

    fn set_multiple(&self, items: Vec<CacheItem>) -> CacheResult<()> {
        self.inner.set_multiple(items)
    }

    fn delete(&self, cid: &str) -> CacheResult<()> {
        self.inner.delete(cid)
    }

    fn delete_multiple(&self, cids: &[String]) -> CacheResult<()> {
        self.inner.delete_multiple(cids)
    }

    fn delete_all(&self) -> CacheResult<()> {
        self.inner.delete_all()
    }

    fn invalidate(&self, cid: &str) -> CacheResult<()> {
        self.inner.invalidate(cid)
    }

    fn invalidate_multiple(&self, cids: &[String]) -> CacheResult<()> {
        self.inner.invalidate_multiple(cids)
    }

    fn invalidate_all(&self) -> CacheResult<()> {
        self.inner.invalidate_all()
    }

    fn garbage_collection(&self) -> CacheResult<()> {
        self.inner.garbage_collection()
    }

    fn remove_bin(&self) -> CacheResult<()> {
        self.inner.remove_bin()
    }

    fn as_tag_invalidator(&self) -> Option<&dyn CacheTagsInvalidator> {
        Some(self)
    }
}

impl CacheTagsInvalidator for InstrumentedCacheBackend {
    /// Forward only when the wrapped backend has the capability.
    ///
    /// Tag-invalidation telemetry belongs to
    /// [`TagInvalidationRecorder`](crate::TagInvalidationRecorder), which
    /// observes invalidations centrally; emitting here as well would double
    /// record when both sit in the same pipeline.
    fn invalidate_tags(&self, tags: &[String]) -> CacheResult<()> {
        match self.inner.as_tag_invalidator() {
            Some(invalidator) => invalidator.invalidate_tags(tags),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the read decorator.
    use serde_json::json;

    use super::*;
    use crate::context::StaticRequestContext;
    use crate::telemetry::AttributeValue;
    use crate::testing::{MemoryBackend, RecordingSink};
    use crate::time::MockClock;

    fn wrapper(
        backend: Arc<MemoryBackend>,
        sink: Arc<RecordingSink>,
        clock: MockClock,
    ) -> InstrumentedCacheBackend {
        let context = Arc::new(
            StaticRequestContext::new().with_path("/node/1").with_user("editor"),
        );
        InstrumentedCacheBackend::with_clock(backend, "render", sink, context, Arc::new(clock))
    }

    /// Validates `get` attribute assembly for the hit scenario.
    ///
    /// Assertions:
    /// - Confirms one event with hit=1/miss=0.
    /// - Confirms expire and space-joined tags are present.
    /// - Confirms the measured duration reflects the mock clock.
    #[test]
    fn test_get_hit_event_attributes() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(
                "front",
                json!("markup"),
                Expiration::Permanent,
                &["node:1".to_string(), "node_list".to_string()],
            )
            .unwrap();

        let sink = Arc::new(RecordingSink::new());
        let clock = MockClock::new();
        let instrumented = wrapper(backend, Arc::clone(&sink), clock.clone());

        let entry = instrumented.get("front", false).unwrap();
        assert!(entry.is_some());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.name, CACHE_GET_EVENT);
        assert_eq!(event.attribute(attribute::HIT), Some(&AttributeValue::Int(1)));
        assert_eq!(event.attribute(attribute::MISS), Some(&AttributeValue::Int(0)));
        assert_eq!(event.attribute(attribute::EXPIRE), Some(&AttributeValue::Int(-1)));
        assert_eq!(
            event.attribute(attribute::TAGS),
            Some(&AttributeValue::Str("node:1 node_list".to_string()))
        );
        assert_eq!(event.attribute(attribute::IS_MULTIPLE), Some(&AttributeValue::Bool(false)));
        assert_eq!(event.attribute(attribute::DURATION), Some(&AttributeValue::Int(0)));
        assert_eq!(event.attribute(attribute::URI), Some(&AttributeValue::Str("/node/1".into())));
        assert_eq!(event.attribute(attribute::UID), Some(&AttributeValue::Str("editor".into())));
    }

    /// Validates `get` attribute assembly for the miss scenario.
    ///
    /// Assertions:
    /// - Confirms one event with hit=0/miss=1.
    /// - Ensures expire and tags attributes are absent.
    #[test]
    fn test_get_miss_event_attributes() {
        let backend = Arc::new(MemoryBackend::new());
        let sink = Arc::new(RecordingSink::new());
        let instrumented = wrapper(backend, Arc::clone(&sink), MockClock::new());

        let entry = instrumented.get("absent", false).unwrap();
        assert!(entry.is_none());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.attribute(attribute::HIT), Some(&AttributeValue::Int(0)));
        assert_eq!(event.attribute(attribute::MISS), Some(&AttributeValue::Int(1)));
        assert!(event.attribute(attribute::EXPIRE).is_none());
        assert!(event.attribute(attribute::TAGS).is_none());
    }

    /// Validates `get_multiple` event fan-out and ordering.
    ///
    /// Assertions:
    /// - Confirms one event per requested id, in input order.
    /// - Confirms duration is absent and is_multiple true on every event.
    /// - Confirms the returned map and residual miss list are untouched by
    ///   telemetry.
    #[test]
    fn test_get_multiple_event_per_requested_id() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("a", json!(1), Expiration::Permanent, &[]).unwrap();
        backend.set("c", json!(3), Expiration::Permanent, &[]).unwrap();

        let sink = Arc::new(RecordingSink::new());
        let instrumented = wrapper(backend, Arc::clone(&sink), MockClock::new());

        let mut cids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let entries = instrumented.get_multiple(&mut cids, false).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(cids, vec!["b".to_string()]);

        let events = sink.events();
        assert_eq!(events.len(), 3);
        let hits: Vec<i64> = events
            .iter()
            .map(|e| match e.attribute(attribute::HIT) {
                Some(AttributeValue::Int(v)) => *v,
                other => panic!("unexpected hit attribute: {other:?}"),
            })
            .collect();
        assert_eq!(hits, vec![1, 0, 1]);
        for event in &events {
            assert!(event.attribute(attribute::DURATION).is_none());
            assert_eq!(event.attribute(attribute::IS_MULTIPLE), Some(&AttributeValue::Bool(true)));
        }
        let cids_seen: Vec<String> = events
            .iter()
            .map(|e| e.attribute(attribute::CID).map(ToString::to_string).unwrap_or_default())
            .collect();
        assert_eq!(cids_seen, vec!["a", "b", "c"]);
    }

    /// Validates that a failing sink never affects the cache result.
    ///
    /// Assertions:
    /// - Confirms the entry is still returned when every send fails.
    #[test]
    fn test_sink_failure_is_swallowed() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set("front", json!("markup"), Expiration::Permanent, &[]).unwrap();

        let sink = Arc::new(RecordingSink::new());
        sink.fail_sends(true);
        let instrumented = wrapper(backend, Arc::clone(&sink), MockClock::new());

        let entry = instrumented.get("front", false).unwrap();
        assert!(entry.is_some());
        assert!(sink.events().is_empty());
    }

    /// Validates the tag-invalidation capability forwarding.
    ///
    /// Assertions:
    /// - Confirms tags reach a capable inner backend.
    /// - Confirms the call is a no-op against an incapable backend.
    /// - Ensures no telemetry is emitted either way.
    #[test]
    fn test_invalidate_tags_capability_check() {
        let capable = Arc::new(MemoryBackend::new());
        capable.set("front", json!(1), Expiration::Permanent, &["node:1".to_string()]).unwrap();
        let sink = Arc::new(RecordingSink::new());
        let instrumented = wrapper(Arc::clone(&capable), Arc::clone(&sink), MockClock::new());

        instrumented.invalidate_tags(&["node:1".to_string()]).unwrap();
        assert_eq!(capable.invalidated_tags(), vec!["node:1".to_string()]);
        assert!(sink.events().is_empty());

        let incapable = Arc::new(MemoryBackend::without_tag_support());
        let sink2 = Arc::new(RecordingSink::new());
        let instrumented2 = wrapper(incapable, Arc::clone(&sink2), MockClock::new());
        instrumented2.invalidate_tags(&["node:1".to_string()]).unwrap();
        assert!(sink2.events().is_empty());
    }

    /// Validates that a measured duration lands in the event.
    ///
    /// Assertions:
    /// - Confirms the duration attribute equals the clock advancement done
    ///   by the backend during the read.
    #[test]
    fn test_get_duration_measured_with_clock() {
        let clock = MockClock::new();
        let backend = Arc::new(MemoryBackend::new().with_read_delay(clock.clone(), 12));
        backend.set("slow", json!(1), Expiration::Permanent, &[]).unwrap();

        let sink = Arc::new(RecordingSink::new());
        let instrumented = wrapper(backend, Arc::clone(&sink), clock);

        instrumented.get("slow", false).unwrap();
        let events = sink.events();
        assert_eq!(events[0].attribute(attribute::DURATION), Some(&AttributeValue::Int(12)));
    }
}
