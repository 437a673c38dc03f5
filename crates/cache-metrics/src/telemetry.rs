//! Telemetry events and the sink they are handed to
//!
//! A [`TelemetryEvent`] is a named record with a flat map of scalar
//! attributes, built fresh per observed cache operation and immediately
//! handed to the [`TelemetrySink`]. Emission is fire-and-forget: the result
//! is never allowed to alter the outcome of the cache operation that
//! triggered it.
//!
//! Event and attribute names are centralised here as constants. Attribute
//! sets drifted across historical versions of the wrapped deployment; a host
//! pinned to an older shape can remap names at its sink implementation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TelemetryResult;

/// Event emitted once per requested cache id on reads.
pub const CACHE_GET_EVENT: &str = "CacheGet";

/// Event emitted once per uniquely invalidated tag per request.
pub const INVALIDATE_TAG_EVENT: &str = "InvalidateTag";

/// Attribute names shared by both event types.
pub mod attribute {
    /// Milliseconds the single read took (absent on batch reads)
    pub const DURATION: &str = "duration";
    /// Cache id of the read
    pub const CID: &str = "cid";
    /// Bin (namespace) the read went to
    pub const BIN: &str = "bin";
    /// 1 when the id was found, 0 otherwise
    pub const HIT: &str = "hit";
    /// 1 when the id was missing, 0 otherwise
    pub const MISS: &str = "miss";
    /// Expiration of the found entry (unix seconds, -1 for permanent)
    pub const EXPIRE: &str = "expire";
    /// Space-joined tags of the found entry
    pub const TAGS: &str = "tags";
    /// Whether the read was part of a batch
    pub const IS_MULTIPLE: &str = "is_multiple";
    /// Invalidated tag
    pub const TAG: &str = "tag";
    /// Path of the current request
    pub const URI: &str = "uri";
    /// Request-correlation id sourced from the environment or headers
    pub const REQUEST_ID: &str = "request_id";
    /// CDN trace header value
    pub const CF_RAY: &str = "cf_ray";
    /// Identifier of the acting user
    pub const UID: &str = "uid";
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String value
    Str(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Explicit null
    Null,
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A named telemetry event with flat scalar attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Event type name
    pub name: String,

    /// Attribute name to scalar value
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl TelemetryEvent {
    /// Create a new event with no attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: BTreeMap::new() }
    }

    /// Set an attribute
    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set an attribute only when a value is present
    pub fn with_optional_attribute<V>(self, key: impl Into<String>, value: Option<V>) -> Self
    where
        V: Into<AttributeValue>,
    {
        match value {
            Some(value) => self.with_attribute(key, value),
            None => self,
        }
    }

    /// Look up an attribute by name
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

/// Trait for monitoring sinks accepting telemetry events.
///
/// Fire-and-forget: callers in this crate never let a sink failure surface
/// to the cache caller.
pub trait TelemetrySink: Send + Sync + fmt::Debug {
    /// Whether the sink is structurally able to accept events
    /// (e.g. the monitoring agent is present)
    fn is_available(&self) -> bool {
        true
    }

    /// Record one event
    fn record_event(&self, event: TelemetryEvent) -> TelemetryResult<()>;
}

/// No-op sink for hosts running without a monitoring backend.
#[derive(Debug, Clone, Default)]
pub struct NoOpTelemetrySink;

impl TelemetrySink for NoOpTelemetrySink {
    fn is_available(&self) -> bool {
        false
    }

    fn record_event(&self, _event: TelemetryEvent) -> TelemetryResult<()> {
        Ok(())
    }
}
