//! Durable log collaborator
//!
//! The invalidation recorder writes one debug line per invalidation batch to
//! a host-owned log channel. Unlike the crate's own `tracing` diagnostics,
//! that channel can be backed by durable storage and can therefore fail
//! (e.g. its schema is being removed while invalidations for that very
//! teardown are still flowing). The trait makes the failure explicit so the
//! recorder can catch and ignore it.

use std::fmt;

use crate::error::LogError;

/// Host-owned log channel with fallible writes.
pub trait Logger: Send + Sync + fmt::Debug {
    /// Write a debug-level message
    fn debug(&self, message: &str) -> Result<(), LogError>;

    /// Write a warning-level message
    fn warning(&self, message: &str) -> Result<(), LogError>;
}

/// [`Logger`] adapter forwarding to the `tracing` ecosystem.
///
/// Never fails; suitable for hosts without a durable log channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) -> Result<(), LogError> {
        tracing::debug!(target: "cache_metrics", "{message}");
        Ok(())
    }

    fn warning(&self, message: &str) -> Result<(), LogError> {
        tracing::warn!(target: "cache_metrics", "{message}");
        Ok(())
    }
}
