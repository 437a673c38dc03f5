//! Error types used throughout the instrumentation layer
//!
//! Three error domains exist and they are handled very differently:
//!
//! - [`CacheError`] is raised by the wrapped backend and propagates to the
//!   caller unchanged. The decorator never constructs or translates these.
//! - [`TelemetryError`] is raised by the monitoring sink. Emission is a
//!   best-effort side channel, so these are logged at debug level and
//!   swallowed at the observation site.
//! - [`LogError`] is raised by the durable log collaborator. Invalidation
//!   summaries must never abort the invalidation itself, so these are
//!   ignored entirely.

use std::io;

use thiserror::Error;

/// Errors raised by a wrapped cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Underlying storage failure (I/O, database, etc.)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A remote cache service failed or was unreachable
    #[error("Backend '{service}' failed: {message}")]
    Backend { service: String, message: String },

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by a telemetry sink.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The sink's capability check failed (monitoring agent not present)
    #[error("telemetry sink is unavailable")]
    Unavailable,

    /// Network send failed
    #[error("telemetry send failed: {source}")]
    SendFailed {
        #[from]
        source: io::Error,
    },

    /// The sink refused the event
    #[error("telemetry event rejected: {0}")]
    Rejected(String),
}

/// Result type alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised by the durable log collaborator.
///
/// A log sink can disappear mid-process, e.g. when the module backing it is
/// being uninstalled while tag invalidations for its own teardown are still
/// flowing. Callers in this crate catch and ignore these.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log sink's storage has been torn down
    #[error("log sink closed: {0}")]
    SinkClosed(String),
}
