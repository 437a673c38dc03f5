//! Pass-through instrumentation for tag-aware cache backends.
//!
//! This crate decorates an existing key-value cache service: every read,
//! write and tag invalidation is forwarded to the wrapped backend
//! unchanged, and read outcomes (hit/miss, duration, tags) plus tag
//! invalidations are reported as structured telemetry events to an
//! external monitoring sink.
//!
//! # Components
//!
//! - [`InstrumentedCacheBackend`] wraps one backend bound to one bin and
//!   emits one `CacheGet` event per requested id on reads.
//! - [`InstrumentedCacheFactory`] hands out wrapped or raw backends per
//!   bin, applying the [`InstrumentationPolicy`] and the sink's
//!   availability on every call.
//! - [`TagInvalidationRecorder`] observes centrally dispatched tag
//!   invalidations and emits one `InvalidateTag` event per uniquely
//!   invalidated tag per request.
//!
//! The cache backend, its factory, the telemetry sink, the request context
//! and the durable logger are all host-owned collaborators described by
//! traits in this crate; in-memory doubles for each live in [`testing`].
//!
//! # Failure semantics
//!
//! Backend errors propagate to the caller untouched. Telemetry and log
//! failures are best-effort side channels: they are swallowed where they
//! occur and never alter the result of the cache operation that triggered
//! them.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod backend;
pub mod context;
pub mod entry;
pub mod error;
pub mod factory;
pub mod instrument;
pub mod logger;
pub mod policy;
pub mod recorder;
pub mod telemetry;
pub mod testing;
pub mod time;

// Re-export commonly used types and traits for convenience
pub use backend::{CacheBackend, CacheFactory, CacheTagsInvalidator};
pub use context::{RequestContext, StaticRequestContext, REQUEST_ID_ENV};
pub use entry::{CacheEntry, CacheItem, Expiration, CACHE_PERMANENT};
pub use error::{CacheError, CacheResult, LogError, TelemetryError, TelemetryResult};
pub use factory::InstrumentedCacheFactory;
pub use instrument::InstrumentedCacheBackend;
pub use logger::{Logger, TracingLogger};
pub use policy::{InstrumentationPolicy, InstrumentationPolicyBuilder, EXCLUDE_ALL};
pub use recorder::{TagInvalidationRecorder, TRACE_HEADER};
pub use telemetry::{
    AttributeValue, NoOpTelemetrySink, TelemetryEvent, TelemetrySink, CACHE_GET_EVENT,
    INVALIDATE_TAG_EVENT,
};
pub use time::{Clock, MockClock, SystemClock};
