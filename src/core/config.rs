//! # Host context configuration.
//!
//! Provides [`BridgeConfig`], the settings a [`HostContext`](crate::HostContext)
//! is built from.
//!
//! Config is used in two ways:
//! 1. **Context creation**: `HostContext::builder(config, main_looper)`
//! 2. **Task defaults**: `HeadlessTaskConfig::with_defaults(key, &config)`
//!
//! ## Sentinel values
//! - `task_timeout = 0s` → no timeout (treated as `None` by `HeadlessTaskConfig::with_defaults`)

use std::time::Duration;

use crate::queue::QueueConfigurationSpec;

/// Settings for one host context.
///
/// ## Field semantics
/// - `queues`: which workers back the scripting and native module roles
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `task_timeout`: Default headless task timeout (`0s` = no timeout)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors over
/// sentinel checks (`0`) scattered across the codebase.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Queue layout for the scripting and native modules roles.
    ///
    /// The UI role is always the host's main looper.
    pub queues: QueueConfigurationSpec,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Default headless task timeout.
    ///
    /// - `Duration::ZERO` = no timeout (task runs until finished)
    /// - `> 0` = task is finished automatically after this long
    ///
    /// Used by `HeadlessTaskConfig::with_defaults()`. Can be overridden per-task.
    pub task_timeout: Duration,
}

impl BridgeConfig {
    /// Returns the default headless task timeout as an `Option`.
    #[inline]
    pub fn default_task_timeout(&self) -> Option<Duration> {
        if self.task_timeout == Duration::ZERO {
            None
        } else {
            Some(self.task_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for BridgeConfig {
    /// Default configuration:
    ///
    /// - `queues`: scripting on `"js"`, native modules on `"native_modules"`, both draining on quit
    /// - `bus_capacity = 1024`
    /// - `task_timeout = 0s` (no timeout)
    fn default() -> Self {
        Self {
            queues: QueueConfigurationSpec::default(),
            bus_capacity: 1024,
            task_timeout: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_map_to_none() {
        let mut cfg = BridgeConfig {
            bus_capacity: 0,
            ..BridgeConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.default_task_timeout(), None);

        cfg.task_timeout = Duration::from_secs(3);
        assert_eq!(cfg.default_task_timeout(), Some(Duration::from_secs(3)));
    }
}
