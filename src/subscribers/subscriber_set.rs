//! # Non-blocking event fan-out to multiple subscribers.
//!
//! Provides [`SubscriberSet`], which distributes events to multiple subscribers
//! concurrently without blocking the publisher.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//!          (bounded)
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` returns immediately (uses `try_send`)
//! - **Isolation**: a slow or panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//!
//! Workers are spawned with `tokio::spawn`, so the set must be created inside
//! a runtime. [`HostContext`](crate::HostContext) does this on its telemetry thread.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Each subscriber gets a bounded queue (capacity from
    /// [`Subscribe::queue_capacity`], minimum 1) and a worker that runs until
    /// the queue is closed.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_message(payload.as_ref());
                        tracing::error!(subscriber = sub.name(), panic = %info, "subscriber panicked");
                        bus_for_worker.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Emits an event to all subscribers (clones the event).
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a pre-allocated `Arc<Event>` to all subscribers.
    ///
    /// On a full or closed queue the event is dropped for that subscriber and
    /// `SubscriberOverflow` is published, unless the event is itself an overflow.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                tracing::warn!(subscriber = channel.name, reason, "subscriber dropped event");
                self.bus.publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// Drops all channel senders, then awaits every worker. Events already
    /// queued are still delivered.
    pub async fn shutdown(self) {
        drop(self.channels);

        for h in self.workers {
            let _ = h.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Arc<Mutex<Vec<EventKind>>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Explodes;

    #[async_trait]
    impl Subscribe for Explodes {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber blew up");
        }
        fn name(&self) -> &'static str {
            "explodes"
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn panicking_subscriber_is_isolated_and_reported() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Explodes),
                Arc::new(Recorder {
                    seen: Arc::clone(&seen),
                }),
            ],
            bus.clone(),
        );
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::TaskStarted));
        set.emit(&Event::new(EventKind::TaskFinished));
        set.shutdown().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![EventKind::TaskStarted, EventKind::TaskFinished]
        );

        let mut panics = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.is_subscriber_panic() {
                assert_eq!(ev.name.as_deref(), Some("explodes"));
                assert_eq!(ev.reason.as_deref(), Some("subscriber blew up"));
                panics += 1;
            }
        }
        assert_eq!(panics, 2);
    }

    struct Slow;

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, _event: &Event) {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        fn name(&self) -> &'static str {
            "slow"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn full_queue_publishes_overflow() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Slow)], bus.clone());

        // The worker has not been polled yet, so the second event finds the queue full.
        set.emit(&Event::new(EventKind::HostResumed));
        set.emit(&Event::new(EventKind::HostPaused));

        let ev = rx.try_recv().unwrap();
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.name.as_deref(), Some("slow"));
        set.shutdown().await;
    }
}
