//! Tag invalidation recorder
//!
//! Observes tag-based invalidations wherever they are centrally dispatched,
//! independent of which bin or backend is affected. Emits one debug log
//! line per batch and one `InvalidateTag` event per tag newly seen within
//! the current request. The recorder never performs the underlying
//! invalidation and never raises to its caller: it only observes and
//! reports.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::backend::CacheTagsInvalidator;
use crate::context::RequestContext;
use crate::error::CacheResult;
use crate::logger::Logger;
use crate::telemetry::{attribute, TelemetryEvent, TelemetrySink, INVALIDATE_TAG_EVENT};

/// Request header consulted for the CDN trace id.
pub const TRACE_HEADER: &str = "cf-ray";

/// Request-scoped observer of tag invalidations.
///
/// Hosts running a long-lived worker process must call
/// [`TagInvalidationRecorder::reset`] at request boundaries; two logical
/// requests must never share dedup state.
pub struct TagInvalidationRecorder {
    logger: Arc<dyn Logger>,
    sink: Arc<dyn TelemetrySink>,
    context: Arc<dyn RequestContext>,
    enabled: bool,
    invalidated: Mutex<HashSet<String>>,
}

impl fmt::Debug for TagInvalidationRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recorded = self.invalidated.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("TagInvalidationRecorder")
            .field("enabled", &self.enabled)
            .field("recorded_tags", &recorded)
            .finish_non_exhaustive()
    }
}

impl TagInvalidationRecorder {
    /// Create a recorder with an empty per-request set
    pub fn new(
        logger: Arc<dyn Logger>,
        sink: Arc<dyn TelemetrySink>,
        context: Arc<dyn RequestContext>,
        enabled: bool,
    ) -> Self {
        Self { logger, sink, context, enabled, invalidated: Mutex::new(HashSet::new()) }
    }

    /// Whether events are emitted at all: the configured switch combined
    /// with the sink's availability.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.sink.is_available()
    }

    /// Clear the per-request dedup set. Called by the request-lifecycle
    /// collaborator at request boundaries.
    pub fn reset(&self) {
        self.invalidated.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Observe one invalidation batch.
    ///
    /// Always logs the de-duplicated input tags at debug level; the log
    /// sink may be mid-teardown, so its failure is ignored. Then emits one
    /// event per tag not yet recorded in this request, preserving input
    /// order.
    pub fn record(&self, tags: &[String]) {
        let mut unique: Vec<&str> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(&tag.as_str()) {
                unique.push(tag);
            }
        }
        let _ = self.logger.debug(&format!("Invalidating the following tags: {}", unique.join(" ")));

        if !self.is_enabled() {
            return;
        }

        let fresh: Vec<&String> = {
            let mut seen = self.invalidated.lock().unwrap_or_else(PoisonError::into_inner);
            tags.iter().filter(|tag| seen.insert((*tag).clone())).collect()
        };

        for tag in fresh {
            let event = TelemetryEvent::new(INVALIDATE_TAG_EVENT)
                .with_attribute(attribute::TAG, tag.as_str())
                .with_attribute(attribute::URI, self.context.current_path())
                .with_optional_attribute(attribute::REQUEST_ID, self.context.correlation_id())
                .with_optional_attribute(attribute::CF_RAY, self.context.trace_header(TRACE_HEADER))
                .with_optional_attribute(attribute::UID, self.context.current_user());

            if let Err(error) = self.sink.record_event(event) {
                tracing::debug!(%tag, %error, "tag invalidation telemetry dropped");
            }
        }
    }
}

impl CacheTagsInvalidator for TagInvalidationRecorder {
    /// Record only; the actual cache invalidation happens elsewhere in the
    /// host's invalidator pipeline.
    fn invalidate_tags(&self, tags: &[String]) -> CacheResult<()> {
        self.record(tags);
        Ok(())
    }
}
