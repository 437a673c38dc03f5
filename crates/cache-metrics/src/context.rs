//! Per-request context consumed by the instrumentation layer
//!
//! Telemetry events carry the current request's path, correlation id, trace
//! header and acting user. All of that is host-owned state: the host
//! constructs a context at the request boundary and threads it into the
//! factory and recorder. This crate only reads from it.

use std::collections::HashMap;
use std::fmt;

/// Read-only view of the current request.
pub trait RequestContext: Send + Sync + fmt::Debug {
    /// Path of the current request (base path plus path info, no query)
    fn current_path(&self) -> String;

    /// Request-correlation id, when the platform supplies one
    fn correlation_id(&self) -> Option<String>;

    /// Value of a request header, matched case-insensitively
    fn trace_header(&self, name: &str) -> Option<String>;

    /// Identifier of the acting user, when a session exists
    fn current_user(&self) -> Option<String>;
}

/// Environment variable some hosting platforms set to identify a request.
pub const REQUEST_ID_ENV: &str = "HTTP_X_REQUEST_ID";

/// Immutable [`RequestContext`] built once at the request boundary.
///
/// Suitable for hosts whose request data is known up front, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRequestContext {
    path: String,
    correlation_id: Option<String>,
    headers: HashMap<String, String>,
    user: Option<String>,
}

impl StaticRequestContext {
    /// Create an empty context (no path, no user, no headers)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the correlation id
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Source the correlation id from [`REQUEST_ID_ENV`], if set
    pub fn with_correlation_id_from_env(mut self) -> Self {
        self.correlation_id = std::env::var(REQUEST_ID_ENV).ok();
        self
    }

    /// Add a request header (stored and matched case-insensitively)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Set the acting user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

impl RequestContext for StaticRequestContext {
    fn current_path(&self) -> String {
        self.path.clone()
    }

    fn correlation_id(&self) -> Option<String> {
        self.correlation_id.clone()
    }

    fn trace_header(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).cloned()
    }

    fn current_user(&self) -> Option<String> {
        self.user.clone()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the request context.
    use super::*;

    /// Validates `StaticRequestContext` builder behavior.
    ///
    /// Assertions:
    /// - Confirms path, correlation id and user round-trip.
    /// - Confirms header lookup is case-insensitive.
    #[test]
    fn test_static_context_builder() {
        let context = StaticRequestContext::new()
            .with_path("/node/1")
            .with_correlation_id("req-42")
            .with_header("CF-RAY", "abc123-LHR")
            .with_user("editor");

        assert_eq!(context.current_path(), "/node/1");
        assert_eq!(context.correlation_id(), Some("req-42".to_string()));
        assert_eq!(context.trace_header("cf-ray"), Some("abc123-LHR".to_string()));
        assert_eq!(context.trace_header("Cf-Ray"), Some("abc123-LHR".to_string()));
        assert_eq!(context.current_user(), Some("editor".to_string()));
    }

    /// Validates `StaticRequestContext::default` empty behavior.
    ///
    /// Assertions:
    /// - Confirms the empty context reports no correlation id, header or
    ///   user, and an empty path.
    #[test]
    fn test_static_context_empty() {
        let context = StaticRequestContext::new();
        assert_eq!(context.current_path(), "");
        assert_eq!(context.correlation_id(), None);
        assert_eq!(context.trace_header("cf-ray"), None);
        assert_eq!(context.current_user(), None);
    }
}
