//! # Telemetry thread: bus → subscriber fan-out.
//!
//! Subscribers are async, while the rest of the bridge runs on plain threads.
//! A dedicated thread runs a current-thread runtime that listens to the bus
//! and feeds a [`SubscriberSet`].
//!
//! ```text
//! Bus ──► broadcast::Receiver ──► [telemetry thread] ──► SubscriberSet::emit
//!                                        │
//!                      cancel ───────────┴──► drain pending ──► SubscriberSet::shutdown
//! ```
//!
//! The receiver is created before the thread starts, so events published
//! right after [`Telemetry::start`] returns are not missed.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event};
use crate::subscribers::{Subscribe, SubscriberSet};

pub(crate) struct Telemetry {
    token: CancellationToken,
    join: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Telemetry {
    pub(crate) fn start(bus: &Bus, subscribers: Vec<Arc<dyn Subscribe>>) -> std::io::Result<Self> {
        let rx = bus.subscribe();
        let token = CancellationToken::new();
        let bus = bus.clone();
        let cancel = token.clone();

        let join = thread::Builder::new()
            .name("bridge-telemetry".into())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!(error = %e, "telemetry runtime failed to start");
                        return;
                    }
                };
                rt.block_on(listen(rx, subscribers, bus, cancel));
            })?;

        Ok(Self {
            token,
            join: Mutex::new(Some(join)),
        })
    }

    /// Delivers what is already on the bus, stops the subscribers and joins the thread.
    ///
    /// Idempotent.
    pub(crate) fn shutdown(&self) {
        self.token.cancel();
        let join = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(h) = join {
            if h.join().is_err() {
                tracing::error!("telemetry thread panicked");
            }
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn listen(
    mut rx: broadcast::Receiver<Event>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    bus: Bus,
    token: CancellationToken,
) {
    let set = SubscriberSet::new(subscribers, bus);

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                loop {
                    match rx.try_recv() {
                        Ok(ev) => set.emit(&ev),
                        Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }
                break;
            }
            msg = rx.recv() => match msg {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "telemetry listener lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    set.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;

    struct Collect(Arc<Mutex<Vec<EventKind>>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    #[test]
    fn delivers_everything_published_before_shutdown() {
        let bus = Bus::new(64);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let telemetry = Telemetry::start(&bus, vec![Arc::new(Collect(Arc::clone(&seen)))]).unwrap();

        bus.publish(Event::new(EventKind::HostResumed));
        bus.publish(Event::new(EventKind::TaskStarted));
        bus.publish(Event::new(EventKind::ContextDestroyed));
        telemetry.shutdown();
        telemetry.shutdown();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::HostResumed,
                EventKind::TaskStarted,
                EventKind::ContextDestroyed
            ]
        );
    }
}
