//! # Host lifecycle tracking and listener fan-out.
//!
//! ```text
//!                 resume(h)                pause(current)
//! BeforeCreate ──────────────► Resumed ──────────────────► BeforeResume
//!      ▲                          ▲                              │
//!      │      destroy(current)    └──────── resume(h) ───────────┤
//!      └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - `resume(h)` makes `h` the current host and always notifies.
//! - `pause(h)` / `destroy(h)` are ignored unless `h` is the current host.
//! - Everything (state changes, fan-out, late-listener catch-up) runs on the UI queue.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::QueueError;
use crate::events::{Bus, Event, EventKind};
use crate::listeners::{call_guarded, ListenerSet};
use crate::queue::MessageQueueThread;

/// Identity of a host (an activity/window owning the UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(u64);

impl HostId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Where the current host is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// No host, or the current host was destroyed.
    #[default]
    BeforeCreate,
    /// A host exists but is paused.
    BeforeResume,
    /// A host is in the foreground.
    Resumed,
}

/// Receives host resume/pause/destroy on the UI queue.
pub trait LifecycleEventListener: Send + Sync + 'static {
    fn on_host_resume(&self);
    fn on_host_pause(&self);
    fn on_host_destroy(&self);
}

#[derive(Debug, Default)]
struct HostState {
    state: LifecycleState,
    current: Option<HostId>,
}

pub(crate) struct LifecycleTracker {
    ui: Arc<MessageQueueThread>,
    bus: Bus,
    host: Mutex<HostState>,
    listeners: ListenerSet<dyn LifecycleEventListener>,
}

impl LifecycleTracker {
    pub(crate) fn new(ui: Arc<MessageQueueThread>, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            ui,
            bus,
            host: Mutex::new(HostState::default()),
            listeners: ListenerSet::new(),
        })
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.lock().state
    }

    pub(crate) fn current_host(&self) -> Option<HostId> {
        self.lock().current
    }

    pub(crate) fn is_resumed(&self) -> bool {
        self.state() == LifecycleState::Resumed
    }

    pub(crate) fn on_host_resume(self: &Arc<Self>, host: HostId) -> Result<(), QueueError> {
        let me = Arc::clone(self);
        self.ui.run_sync(move || {
            {
                let mut h = me.lock();
                h.state = LifecycleState::Resumed;
                h.current = Some(host);
            }
            me.bus.publish(Event::new(EventKind::HostResumed).with_host(host));
            me.notify("on_host_resume", |l| l.on_host_resume());
        })
    }

    pub(crate) fn on_host_pause(self: &Arc<Self>, host: HostId) -> Result<(), QueueError> {
        let me = Arc::clone(self);
        self.ui.run_sync(move || {
            if !me.transition_if_current(host, LifecycleState::BeforeResume, false) {
                return;
            }
            me.bus.publish(Event::new(EventKind::HostPaused).with_host(host));
            me.notify("on_host_pause", |l| l.on_host_pause());
        })
    }

    pub(crate) fn on_host_destroy(self: &Arc<Self>, host: HostId) -> Result<(), QueueError> {
        let me = Arc::clone(self);
        self.ui.run_sync(move || {
            if !me.transition_if_current(host, LifecycleState::BeforeCreate, true) {
                return;
            }
            me.bus.publish(Event::new(EventKind::HostDestroyed).with_host(host));
            me.notify("on_host_destroy", |l| l.on_host_destroy());
        })
    }

    /// Registers `listener`; if a host is resumed it is told so right away.
    pub(crate) fn add_listener(
        self: &Arc<Self>,
        listener: Arc<dyn LifecycleEventListener>,
    ) -> Result<bool, QueueError> {
        let me = Arc::clone(self);
        self.ui.run_sync(move || {
            if !me.listeners.add(Arc::clone(&listener)) {
                return false;
            }
            if me.is_resumed() {
                if let Err(message) = call_guarded(|| listener.on_host_resume()) {
                    me.report_panic("on_host_resume", message);
                }
            }
            true
        })
    }

    pub(crate) fn remove_listener(&self, listener: &Arc<dyn LifecycleEventListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub(crate) fn clear_listeners(&self) {
        self.listeners.clear();
    }

    fn transition_if_current(&self, host: HostId, to: LifecycleState, forget: bool) -> bool {
        let mut h = self.lock();
        if h.current != Some(host) {
            tracing::debug!(host = host.get(), current = ?h.current.map(HostId::get), "ignoring lifecycle call from non-current host");
            return false;
        }
        h.state = to;
        if forget {
            h.current = None;
        }
        true
    }

    fn notify(&self, hook: &'static str, f: impl FnMut(&dyn LifecycleEventListener)) {
        for message in self.listeners.notify(f) {
            self.report_panic(hook, message);
        }
    }

    fn report_panic(&self, hook: &'static str, message: String) {
        tracing::error!(hook, panic = %message, "lifecycle listener panicked");
        self.bus.publish(
            Event::new(EventKind::ListenerPanicked)
                .with_name(hook)
                .with_reason(message),
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.host.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
