//! # Headless task configuration.
//!
//! A [`HeadlessTaskConfig`] can be created:
//! - **Explicitly** with [`HeadlessTaskConfig::new`] and the `with_*` builders
//! - **From config** with [`HeadlessTaskConfig::with_defaults`] (inherits the default timeout)

use std::sync::Arc;
use std::time::Duration;

use crate::core::BridgeConfig;

/// What to run and under which constraints.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use bridgevisor::{BridgeConfig, HeadlessTaskConfig};
///
/// let cfg = HeadlessTaskConfig::new("sync-contacts")
///     .with_data(r#"{"full":true}"#)
///     .with_timeout(Duration::from_secs(30))
///     .allowed_in_foreground(true);
/// assert_eq!(cfg.timeout(), Some(Duration::from_secs(30)));
///
/// // `task_timeout = 0s` is treated as `None`.
/// let cfg = HeadlessTaskConfig::with_defaults("upload", &BridgeConfig::default());
/// assert!(cfg.timeout().is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadlessTaskConfig {
    task_key: Arc<str>,
    data: Option<Arc<str>>,
    timeout: Option<Duration>,
    retryable: bool,
    allowed_in_foreground: bool,
}

impl HeadlessTaskConfig {
    /// A task with no data, no timeout, not retryable, background only.
    pub fn new(task_key: impl Into<Arc<str>>) -> Self {
        Self {
            task_key: task_key.into(),
            data: None,
            timeout: None,
            retryable: false,
            allowed_in_foreground: false,
        }
    }

    /// A task whose timeout comes from `config`.
    pub fn with_defaults(task_key: impl Into<Arc<str>>, config: &BridgeConfig) -> Self {
        Self {
            timeout: config.default_task_timeout(),
            ..Self::new(task_key)
        }
    }

    /// Payload handed to the script side (typically JSON).
    pub fn with_data(mut self, data: impl Into<Arc<str>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Finish the task automatically after `timeout`; zero means no timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (timeout > Duration::ZERO).then_some(timeout);
        self
    }

    /// Retryable tasks never get a timeout scheduled.
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Allow the task to start while the host is resumed.
    pub fn allowed_in_foreground(mut self, allowed: bool) -> Self {
        self.allowed_in_foreground = allowed;
        self
    }

    pub fn task_key(&self) -> &str {
        &self.task_key
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn is_allowed_in_foreground(&self) -> bool {
        self.allowed_in_foreground
    }

    /// The timeout to schedule at start, if any.
    pub(crate) fn scheduled_timeout(&self) -> Option<Duration> {
        if self.retryable {
            None
        } else {
            self.timeout
        }
    }

    pub(crate) fn task_key_arc(&self) -> &Arc<str> {
        &self.task_key
    }
}
