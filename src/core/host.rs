//! # HostContext: one bridge instance bound to a host.
//!
//! Owns every per-context component and hands out references to them:
//!
//! ```text
//! HostContext
//!   ├─ BridgeConfig
//!   ├─ Bus ──► Telemetry (optional) ──► SubscriberSet
//!   ├─ Markers
//!   ├─ QueueConfiguration { ui, native_modules, scripting }
//!   ├─ ScriptRuntime
//!   ├─ FallbackBundleLoader      (used on the scripting queue)
//!   ├─ LifecycleTracker          (used on the UI queue)
//!   ├─ HeadlessTaskContext       (created on first use, used on the UI queue)
//!   └─ ExceptionHandler
//! ```
//!
//! `destroy()` tears it down in order: headless tasks, lifecycle listeners,
//! owned queues, then telemetry (after `ContextDestroyed` was published).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::core::config::BridgeConfig;
use crate::core::lifecycle::{HostId, LifecycleEventListener, LifecycleState, LifecycleTracker};
use crate::core::telemetry::Telemetry;
use crate::error::{BridgeError, Fault};
use crate::events::{Bus, Event, EventKind};
use crate::frame::{GuardedFrame, GuardedFrameCallback};
use crate::loader::{Bundle, BundleLoader, FallbackBundleLoader, ScriptRuntime};
use crate::markers::{Markers, Phase};
use crate::queue::{ExceptionHandler, MessageQueueThread, QueueConfiguration};
use crate::tasks::HeadlessTaskContext;

/// A bridge instance: queues, bundle loading, lifecycle and headless tasks.
///
/// Built with [`HostContext::builder`](crate::HostContext::builder).
pub struct HostContext {
    pub(crate) cfg: BridgeConfig,
    pub(crate) bus: Bus,
    pub(crate) markers: Markers,
    pub(crate) queues: QueueConfiguration,
    pub(crate) runtime: Arc<dyn ScriptRuntime>,
    pub(crate) loader: Arc<Mutex<FallbackBundleLoader>>,
    pub(crate) lifecycle: Arc<LifecycleTracker>,
    pub(crate) headless: OnceLock<HeadlessTaskContext>,
    pub(crate) handler: Arc<dyn ExceptionHandler>,
    pub(crate) telemetry: Option<Telemetry>,
    pub(crate) destroyed: AtomicBool,
}

impl HostContext {
    pub fn config(&self) -> &BridgeConfig {
        &self.cfg
    }

    /// Event bus of this context.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Marker emitter publishing on this context's bus.
    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn queues(&self) -> &QueueConfiguration {
        &self.queues
    }

    pub fn ui_queue(&self) -> &Arc<MessageQueueThread> {
        self.queues.ui_queue()
    }

    pub fn native_modules_queue(&self) -> &Arc<MessageQueueThread> {
        self.queues.native_modules_queue()
    }

    pub fn scripting_queue(&self) -> &Arc<MessageQueueThread> {
        self.queues.scripting_queue()
    }

    /// Loads and evaluates the bundle on the scripting queue.
    ///
    /// Blocks until the loader chain returns. Recoverable failures fall back
    /// to the next loader; a fatal error or exhaustion is returned.
    pub fn run_bundle(&self) -> Result<Bundle, BridgeError> {
        self.ensure_live()?;
        let _span = self.markers.begin(Phase::RunBundle);

        let loader = Arc::clone(&self.loader);
        let runtime = Arc::clone(&self.runtime);
        let loaded = self.scripting_queue().run_sync(move || {
            loader
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .load_script(runtime.as_ref())
        })?;

        match loaded {
            Ok(bundle) => {
                tracing::info!(url = bundle.source_url(), "bundle loaded");
                self.bus.publish(Event::new(EventKind::BundleLoaded).with_name(bundle.source_url()));
                Ok(bundle)
            }
            Err(e) => {
                tracing::error!(error = %e, label = e.as_label(), "bundle load failed");
                self.bus.publish(Event::new(EventKind::BundleLoadFailed).with_reason(e.as_message()));
                Err(BridgeError::Load(e))
            }
        }
    }

    /// The headless task registry of this context, created on first use.
    pub fn headless_tasks(&self) -> Result<&HeadlessTaskContext, BridgeError> {
        self.ensure_live()?;
        Ok(self.headless.get_or_init(|| {
            HeadlessTaskContext::new(
                Arc::clone(self.ui_queue()),
                Arc::clone(self.scripting_queue()),
                Arc::clone(&self.runtime),
                Arc::clone(&self.lifecycle),
                self.bus.clone(),
            )
        }))
    }

    /// `host` became the foreground host.
    pub fn on_host_resume(&self, host: HostId) -> Result<(), BridgeError> {
        self.ensure_live()?;
        Ok(self.lifecycle.on_host_resume(host)?)
    }

    /// `host` paused; ignored unless it is the current host.
    pub fn on_host_pause(&self, host: HostId) -> Result<(), BridgeError> {
        self.ensure_live()?;
        Ok(self.lifecycle.on_host_pause(host)?)
    }

    /// `host` was destroyed; ignored unless it is the current host.
    pub fn on_host_destroy(&self, host: HostId) -> Result<(), BridgeError> {
        self.ensure_live()?;
        Ok(self.lifecycle.on_host_destroy(host)?)
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn current_host(&self) -> Option<HostId> {
        self.lifecycle.current_host()
    }

    /// Adds a lifecycle listener. If a host is resumed, the listener receives
    /// `on_host_resume` before this returns.
    pub fn add_lifecycle_event_listener(
        &self,
        listener: Arc<dyn LifecycleEventListener>,
    ) -> Result<bool, BridgeError> {
        self.ensure_live()?;
        Ok(self.lifecycle.add_listener(listener)?)
    }

    pub fn remove_lifecycle_event_listener(&self, listener: &Arc<dyn LifecycleEventListener>) -> bool {
        self.lifecycle.remove_listener(listener)
    }

    /// Routes a fault raised outside the queues to this context's handler.
    pub fn handle_exception(&self, fault: Fault) {
        self.handler.handle(fault);
    }

    pub fn exception_handler(&self) -> Arc<dyn ExceptionHandler> {
        Arc::clone(&self.handler)
    }

    /// Wraps `callback` so its faults reach this context's exception handler.
    pub fn guard_frame_callback<C: GuardedFrame>(&self, callback: C) -> GuardedFrameCallback<C> {
        GuardedFrameCallback::new(callback, self.exception_handler())
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Tears the context down. Idempotent.
    ///
    /// The UI looper is left running; it belongs to the host.
    pub fn destroy(&self) -> Result<(), BridgeError> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("destroying host context");

        let mut first_err: Option<BridgeError> = None;
        if let Some(headless) = self.headless.get() {
            if let Err(e) = headless.shutdown() {
                first_err.get_or_insert(e.into());
            }
        }
        self.lifecycle.clear_listeners();
        if let Err(e) = self.queues.destroy() {
            first_err.get_or_insert(e.into());
        }

        self.bus.publish(Event::new(EventKind::ContextDestroyed));
        if let Some(t) = &self.telemetry {
            t.shutdown();
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn ensure_live(&self) -> Result<(), BridgeError> {
        if self.is_destroyed() {
            Err(BridgeError::Destroyed)
        } else {
            Ok(())
        }
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            tracing::warn!(error = %e, "host context teardown failed");
        }
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("queues", &self.queues)
            .field("lifecycle", &self.lifecycle.state())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
