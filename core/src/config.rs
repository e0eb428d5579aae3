//! Per-root configuration.

/// What a state setter does when the new value equals the stored one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum SetStatePolicy {
    /// Every call schedules a pass, even when nothing changed.
    ///
    /// Simple and always correct, at the price of redundant passes.
    #[default]
    AlwaysSchedule,
    /// Calls that store an equal value are dropped.
    SkipUnchanged,
}

/// Behaviour switches for a [`Root`](crate::Root).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct RootConfig {
    /// Scheduling policy for state setters.
    pub set_state: SetStatePolicy,
    /// Fail a pass when a component's hook count changes between renders.
    ///
    /// Kind and type mismatches at a slot are always reported.
    pub check_hook_order: bool,
    /// Catch panics raised by effects and cleanups so sibling effects still run.
    pub isolate_effect_panics: bool,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RootConfig {
    /// Returns the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set_state: SetStatePolicy::AlwaysSchedule,
            check_hook_order: true,
            isolate_effect_panics: true,
        }
    }

    /// Overrides the setter policy.
    #[must_use]
    pub const fn with_set_state(mut self, policy: SetStatePolicy) -> Self {
        self.set_state = policy;
        self
    }

    /// Enables or disables hook count validation.
    #[must_use]
    pub const fn with_hook_order_check(mut self, enabled: bool) -> Self {
        self.check_hook_order = enabled;
        self
    }

    /// Enables or disables effect panic isolation.
    #[must_use]
    pub const fn with_effect_isolation(mut self, enabled: bool) -> Self {
        self.isolate_effect_panics = enabled;
        self
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: RootConfig =
            serde_json::from_str(r#"{ "set_state": "skip_unchanged" }"#).expect("config should parse");
        assert_eq!(config.set_state, SetStatePolicy::SkipUnchanged);
        assert!(config.check_hook_order);
        assert!(config.isolate_effect_panics);
    }
}
