//! Instrumentation enablement policy
//!
//! Controls which bins get a wrapped backend. The policy is a global switch
//! plus an excluded-bin set; the [`EXCLUDE_ALL`] wildcard disables wrapping
//! for every bin while leaving the switch on. Loading the policy from disk
//! or environment is the host's job; this crate only evaluates it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Wildcard bin name meaning "exclude everything".
pub const EXCLUDE_ALL: &str = "*";

/// Decides, per bin, whether instrumentation applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationPolicy {
    /// Global switch; when false no bin is ever wrapped
    pub enabled: bool,

    /// Bin names excluded from wrapping (exact match, or [`EXCLUDE_ALL`])
    pub excluded_bins: HashSet<String>,
}

impl Default for InstrumentationPolicy {
    fn default() -> Self {
        Self { enabled: true, excluded_bins: HashSet::new() }
    }
}

impl InstrumentationPolicy {
    /// Create a new policy builder
    pub fn builder() -> InstrumentationPolicyBuilder {
        InstrumentationPolicyBuilder::default()
    }

    /// Policy that instruments every bin
    pub fn enabled() -> Self {
        Self::default()
    }

    /// Policy that instruments nothing
    pub fn disabled() -> Self {
        Self { enabled: false, excluded_bins: HashSet::new() }
    }

    /// Whether the given bin may be wrapped under this policy
    pub fn allows(&self, bin: &str) -> bool {
        self.enabled
            && !self.excluded_bins.contains(EXCLUDE_ALL)
            && !self.excluded_bins.contains(bin)
    }
}

/// Builder for [`InstrumentationPolicy`] with fluent API
#[derive(Debug, Default)]
pub struct InstrumentationPolicyBuilder {
    policy: InstrumentationPolicy,
}

impl InstrumentationPolicyBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the global switch
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.policy.enabled = enabled;
        self
    }

    /// Exclude a single bin from wrapping
    pub fn exclude_bin(mut self, bin: impl Into<String>) -> Self {
        self.policy.excluded_bins.insert(bin.into());
        self
    }

    /// Exclude several bins from wrapping
    pub fn exclude_bins<I, S>(mut self, bins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.excluded_bins.extend(bins.into_iter().map(Into::into));
        self
    }

    /// Build the policy
    pub fn build(self) -> InstrumentationPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the enablement policy.
    use super::*;

    /// Validates `InstrumentationPolicy::default` behavior.
    ///
    /// Assertions:
    /// - Ensures the default policy is enabled with no exclusions.
    /// - Ensures it allows an arbitrary bin.
    #[test]
    fn test_policy_default() {
        let policy = InstrumentationPolicy::default();
        assert!(policy.enabled);
        assert!(policy.excluded_bins.is_empty());
        assert!(policy.allows("render"));
    }

    /// Validates `InstrumentationPolicy::disabled` behavior.
    ///
    /// Assertions:
    /// - Ensures a disabled policy rejects every bin.
    #[test]
    fn test_policy_disabled() {
        let policy = InstrumentationPolicy::disabled();
        assert!(!policy.allows("render"));
        assert!(!policy.allows("data"));
    }

    /// Validates exact-match bin exclusion.
    ///
    /// Assertions:
    /// - Confirms the excluded bin is rejected.
    /// - Confirms other bins are still allowed.
    #[test]
    fn test_policy_exclude_exact() {
        let policy = InstrumentationPolicy::builder().exclude_bin("cache_render").build();

        assert!(!policy.allows("cache_render"));
        assert!(policy.allows("cache_data"));
    }

    /// Validates the `EXCLUDE_ALL` wildcard.
    ///
    /// Assertions:
    /// - Ensures the wildcard rejects every bin even though the global
    ///   switch is on.
    #[test]
    fn test_policy_wildcard() {
        let policy = InstrumentationPolicy::builder().exclude_bin(EXCLUDE_ALL).build();

        assert!(policy.enabled);
        assert!(!policy.allows("render"));
        assert!(!policy.allows("anything"));
    }

    /// Validates `InstrumentationPolicyBuilder::exclude_bins` bulk insertion.
    ///
    /// Assertions:
    /// - Confirms every listed bin is rejected and the rest allowed.
    #[test]
    fn test_policy_exclude_bins_bulk() {
        let policy =
            InstrumentationPolicy::builder().exclude_bins(["render", "dynamic_page_cache"]).build();

        assert!(!policy.allows("render"));
        assert!(!policy.allows("dynamic_page_cache"));
        assert!(policy.allows("data"));
    }

    /// Validates serde round-trip of the policy.
    ///
    /// Assertions:
    /// - Confirms deserializing the serialized policy yields an equal value.
    #[test]
    fn test_policy_serde_round_trip() {
        let policy = InstrumentationPolicy::builder().enabled(false).exclude_bin("render").build();

        let json = serde_json::to_string(&policy).unwrap();
        let back: InstrumentationPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
