//! Instrumented cache factory
//!
//! Produces a cache handle per bin, deciding on every call whether the
//! handle is wrapped or raw. The enablement decision itself is never
//! cached, so runtime configuration flips take effect without rebuilding
//! the factory; wrapper instances, once created, are cached per bin for
//! the factory's lifetime.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::backend::{CacheBackend, CacheFactory};
use crate::context::RequestContext;
use crate::error::CacheResult;
use crate::instrument::InstrumentedCacheBackend;
use crate::policy::InstrumentationPolicy;
use crate::telemetry::TelemetrySink;
use crate::time::{Clock, SystemClock};

/// Decorating [`CacheFactory`] applying the enablement policy per bin.
pub struct InstrumentedCacheFactory {
    inner: Arc<dyn CacheFactory>,
    policy: RwLock<InstrumentationPolicy>,
    sink: Arc<dyn TelemetrySink>,
    context: Arc<dyn RequestContext>,
    clock: Arc<dyn Clock>,
    backends: RwLock<HashMap<String, Arc<InstrumentedCacheBackend>>>,
}

impl fmt::Debug for InstrumentedCacheFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wrapped = self.backends.read().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("InstrumentedCacheFactory")
            .field("policy", &self.policy)
            .field("wrapped_bins", &wrapped)
            .finish_non_exhaustive()
    }
}

impl InstrumentedCacheFactory {
    /// Create a factory wrapping `inner` with the system clock
    pub fn new(
        inner: Arc<dyn CacheFactory>,
        policy: InstrumentationPolicy,
        sink: Arc<dyn TelemetrySink>,
        context: Arc<dyn RequestContext>,
    ) -> Self {
        Self::with_clock(inner, policy, sink, context, Arc::new(SystemClock))
    }

    /// Create a factory with a custom clock for its wrappers
    pub fn with_clock(
        inner: Arc<dyn CacheFactory>,
        policy: InstrumentationPolicy,
        sink: Arc<dyn TelemetrySink>,
        context: Arc<dyn RequestContext>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner,
            policy: RwLock::new(policy),
            sink,
            context,
            clock,
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Current policy snapshot
    pub fn policy(&self) -> InstrumentationPolicy {
        self.policy.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the policy; takes effect on the next `get` call.
    ///
    /// A bin that already took the unwrapped path is not retroactively
    /// wrapped for handles the caller is still holding, but new `get` calls
    /// re-derive the decision.
    pub fn set_policy(&self, policy: InstrumentationPolicy) {
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    /// Whether instrumentation currently applies to `bin`.
    ///
    /// Re-evaluated on every call: policy allowance plus sink availability.
    pub fn is_enabled_for(&self, bin: &str) -> bool {
        let allowed = self.policy.read().unwrap_or_else(PoisonError::into_inner).allows(bin);
        allowed && self.sink.is_available()
    }
}

impl CacheFactory for InstrumentedCacheFactory {
    fn get(&self, bin: &str) -> CacheResult<Arc<dyn CacheBackend>> {
        if !self.is_enabled_for(bin) {
            // Disabled: hand out the raw backend, uncached, every time.
            return self.inner.get(bin);
        }

        if let Some(backend) =
            self.backends.read().unwrap_or_else(PoisonError::into_inner).get(bin)
        {
            return Ok(Arc::clone(backend) as Arc<dyn CacheBackend>);
        }

        let raw = self.inner.get(bin)?;
        let mut backends = self.backends.write().unwrap_or_else(PoisonError::into_inner);
        let backend = backends.entry(bin.to_string()).or_insert_with(|| {
            Arc::new(InstrumentedCacheBackend::with_clock(
                raw,
                bin,
                Arc::clone(&self.sink),
                Arc::clone(&self.context),
                Arc::clone(&self.clock),
            ))
        });
        Ok(Arc::clone(backend) as Arc<dyn CacheBackend>)
    }
}
