//! # Runtime events emitted by the bridge.
//!
//! The [`EventKind`] enum classifies event types across five categories:
//! - **Host lifecycle**: resume/pause/destroy of the current host, context teardown
//! - **Bundle loading**: fallbacks, success, failure
//! - **Headless tasks**: start, finish, timeout, rejection
//! - **Telemetry**: phase markers
//! - **Delivery**: subscriber/listener overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id,
//! names, reasons and timeouts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bridgevisor::{Event, EventKind, TaskId};
//!
//! let ev = Event::new(EventKind::TaskStarted)
//!     .with_task_id(TaskId::new(7))
//!     .with_name("sync-contacts")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::TaskStarted);
//! assert_eq!(ev.task_id, Some(7));
//! assert_eq!(ev.name.as_deref(), Some("sync-contacts"));
//! assert_eq!(ev.timeout_ms, Some(5_000));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::HostId;
use crate::markers::Marker;
use crate::tasks::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Delivery events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `name`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    /// A task or lifecycle listener panicked while being notified.
    ///
    /// Sets:
    /// - `name`: notification hook (e.g. "on_headless_task_start")
    /// - `reason`: panic message
    /// - `task_id`: task being notified about, if any
    ListenerPanicked,

    // === Host lifecycle events ===
    /// A host became the current, resumed host.
    ///
    /// Sets:
    /// - `host`: host id
    HostResumed,

    /// The current host paused.
    ///
    /// Sets:
    /// - `host`: host id
    HostPaused,

    /// The current host was destroyed.
    ///
    /// Sets:
    /// - `host`: host id
    HostDestroyed,

    /// The host context was torn down (queues quit, registry cleared).
    ContextDestroyed,

    // === Bundle loading events ===
    /// A loader failed recoverably and was popped from the chain.
    ///
    /// Sets:
    /// - `name`: loader name
    /// - `reason`: failure message
    LoaderFellBack,

    /// A bundle was loaded and evaluated.
    ///
    /// Sets:
    /// - `name`: bundle source url
    BundleLoaded,

    /// Loading aborted (fatal error or chain exhausted).
    ///
    /// Sets:
    /// - `reason`: error message
    BundleLoadFailed,

    // === Headless task events ===
    /// A headless task was registered.
    ///
    /// Sets:
    /// - `task_id`: task id
    /// - `name`: task key
    /// - `timeout_ms`: scheduled timeout, if any
    TaskStarted,

    /// A headless task finished on request.
    ///
    /// Sets:
    /// - `task_id`: task id
    TaskFinished,

    /// A headless task hit its timeout and was finished.
    ///
    /// Sets:
    /// - `task_id`: task id
    /// - `timeout_ms`: the timeout that fired
    TaskTimedOut,

    /// A start request was refused.
    ///
    /// Sets:
    /// - `name`: task key
    /// - `reason`: refusal reason
    TaskRejected,

    // === Telemetry ===
    /// A phase marker was logged.
    ///
    /// Sets:
    /// - `marker`: the marker
    /// - `name`: optional tag (e.g. module name)
    MarkerLogged,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Headless task id, if applicable.
    pub task_id: Option<u32>,
    /// Host id, if applicable.
    pub host: Option<u64>,
    /// Task key, loader name, subscriber name or marker tag.
    pub name: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Phase marker, for [`EventKind::MarkerLogged`].
    pub marker: Option<Marker>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task_id: None,
            host: None,
            name: None,
            reason: None,
            timeout_ms: None,
            marker: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a name (task key, loader, subscriber, tag).
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attaches a headless task id.
    #[inline]
    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id.get());
        self
    }

    /// Attaches a host id.
    #[inline]
    pub fn with_host(mut self, host: HostId) -> Self {
        self.host = Some(host.get());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a phase marker.
    #[inline]
    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_name(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_name(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::TaskStarted);
        let b = Event::new(EventKind::TaskFinished);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn timeout_is_clamped_to_u32() {
        let ev = Event::new(EventKind::TaskTimedOut).with_timeout(Duration::from_secs(u64::MAX / 2));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
