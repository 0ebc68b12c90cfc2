//! # Event bus for broadcasting bridge events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from any thread (queue workers, the host's
//! main thread, loaders, the headless task registry).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Subscriber (one):
//!   HeadlessTaskContext ──┐
//!   LifecycleTracker    ──┼──────► Bus ───────► telemetry thread ────► SubscriberSet
//!   FallbackBundleLoader──┤  (broadcast chan)     (in HostContext)
//!   Markers             ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for bridge events.
///
/// Multiple publishers can publish concurrently; subscribers receive clones of each event.
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity.
    ///
    /// Capacity is shared across all receivers; the minimum is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers, the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that will observe subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn publish_without_receivers_is_dropped() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ContextDestroyed));
        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn receivers_see_events_after_subscribing() {
        let bus = Bus::new(4);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::HostPaused));
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::HostPaused);
    }
}
