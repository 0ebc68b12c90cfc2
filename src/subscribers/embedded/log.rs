//! # LogWriter: bus events as `tracing` records
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing::info!`
//! records on the `bridgevisor::events` target. Use it for tests or demos.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO bridgevisor::events: host-resumed host=1
//! INFO bridgevisor::events: loader-fell-back loader="file" reason="recoverable: ..."
//! INFO bridgevisor::events: bundle-loaded url="inline://app"
//! INFO bridgevisor::events: task-started task_id=1 key="sync" timeout_ms=Some(5000)
//! INFO bridgevisor::events: task-timed-out task_id=1 timeout_ms=Some(5000)
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let name = e.name.as_deref().unwrap_or("");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::SubscriberPanicked => {
                tracing::info!(target: "bridgevisor::events", subscriber = name, info = reason, "subscriber-panicked");
            }
            EventKind::SubscriberOverflow => {
                tracing::info!(target: "bridgevisor::events", subscriber = name, reason, "subscriber-overflow");
            }
            EventKind::ListenerPanicked => {
                tracing::info!(target: "bridgevisor::events", hook = name, task_id = ?e.task_id, reason, "listener-panicked");
            }
            EventKind::HostResumed => {
                tracing::info!(target: "bridgevisor::events", host = ?e.host, "host-resumed");
            }
            EventKind::HostPaused => {
                tracing::info!(target: "bridgevisor::events", host = ?e.host, "host-paused");
            }
            EventKind::HostDestroyed => {
                tracing::info!(target: "bridgevisor::events", host = ?e.host, "host-destroyed");
            }
            EventKind::ContextDestroyed => {
                tracing::info!(target: "bridgevisor::events", "context-destroyed");
            }
            EventKind::LoaderFellBack => {
                tracing::info!(target: "bridgevisor::events", loader = name, reason, "loader-fell-back");
            }
            EventKind::BundleLoaded => {
                tracing::info!(target: "bridgevisor::events", url = name, "bundle-loaded");
            }
            EventKind::BundleLoadFailed => {
                tracing::info!(target: "bridgevisor::events", reason, "bundle-load-failed");
            }
            EventKind::TaskStarted => {
                tracing::info!(target: "bridgevisor::events", task_id = ?e.task_id, key = name, timeout_ms = ?e.timeout_ms, "task-started");
            }
            EventKind::TaskFinished => {
                tracing::info!(target: "bridgevisor::events", task_id = ?e.task_id, "task-finished");
            }
            EventKind::TaskTimedOut => {
                tracing::info!(target: "bridgevisor::events", task_id = ?e.task_id, timeout_ms = ?e.timeout_ms, "task-timed-out");
            }
            EventKind::TaskRejected => {
                tracing::info!(target: "bridgevisor::events", key = name, reason, "task-rejected");
            }
            EventKind::MarkerLogged => {
                let marker = e.marker.map(|m| m.name()).unwrap_or("");
                tracing::info!(target: "bridgevisor::events", marker, tag = name, "marker");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
