//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into
//! the bridge. Each subscriber is driven by a dedicated worker loop fed by a
//! bounded queue that is owned by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) and do **not** block the
//!   publisher (a queue worker or the host's main thread) nor other subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped** and a `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use bridgevisor::{Event, EventKind, Subscribe};
//!
//! struct TaskAudit;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for TaskAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskTimedOut {
//!             // write audit record...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "task-audit" }
//!     fn queue_capacity(&self) -> usize { 512 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task on the telemetry thread.
/// Implementations should avoid blocking that runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
