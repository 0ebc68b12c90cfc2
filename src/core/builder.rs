use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, OnceLock};

use crate::core::config::BridgeConfig;
use crate::core::host::HostContext;
use crate::core::lifecycle::LifecycleTracker;
use crate::core::telemetry::Telemetry;
use crate::error::BridgeError;
use crate::events::Bus;
use crate::loader::{BundleLoader, FallbackBundleLoader, ScriptRuntime};
use crate::markers::{Markers, Phase};
use crate::queue::{ExceptionHandler, LogExceptionHandler, LooperHandle, QueueConfiguration};
use crate::subscribers::Subscribe;

impl HostContext {
    /// Starts building a context on the host's main looper.
    pub fn builder(
        cfg: BridgeConfig,
        main: LooperHandle,
        runtime: Arc<dyn ScriptRuntime>,
    ) -> HostContextBuilder {
        HostContextBuilder::new(cfg, main, runtime)
    }
}

/// Builder for [`HostContext`].
pub struct HostContextBuilder {
    cfg: BridgeConfig,
    main: LooperHandle,
    runtime: Arc<dyn ScriptRuntime>,
    loaders: Vec<Box<dyn BundleLoader>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    handler: Arc<dyn ExceptionHandler>,
}

impl HostContextBuilder {
    pub fn new(cfg: BridgeConfig, main: LooperHandle, runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self {
            cfg,
            main,
            runtime,
            loaders: Vec::new(),
            subscribers: Vec::new(),
            handler: Arc::new(LogExceptionHandler),
        }
    }

    /// Appends one loader to the fallback chain (least preferred so far).
    pub fn with_loader(mut self, loader: impl BundleLoader) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    /// Replaces the fallback chain; most preferred first.
    pub fn with_loaders(mut self, loaders: Vec<Box<dyn BundleLoader>>) -> Self {
        self.loaders = loaders;
        self
    }

    /// Sets event subscribers.
    ///
    /// With at least one subscriber a telemetry thread is started; each
    /// subscriber gets its own bounded queue there.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the handler for faults in queued work and guarded callbacks.
    ///
    /// Defaults to [`LogExceptionHandler`].
    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Creates the bus, telemetry, queues, lifecycle tracker and loader chain.
    ///
    /// Emits `CREATE_REACT_CONTEXT_START`/`_END` around the whole setup and
    /// `CREATE_CATALYST_INSTANCE_START`/`_END` around queue creation.
    pub fn build(self) -> Result<HostContext, BridgeError> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let telemetry = if self.subscribers.is_empty() {
            None
        } else {
            Some(
                Telemetry::start(&bus, self.subscribers)
                    .map_err(|source| BridgeError::Telemetry { source })?,
            )
        };

        let markers = Markers::new(bus.clone());
        let setup = markers.begin(Phase::CreateContext);

        let queues = {
            let _instance = markers.begin(Phase::CreateInstance);
            QueueConfiguration::create(&self.cfg.queues, self.main, Arc::clone(&self.handler))?
        };

        let lifecycle = LifecycleTracker::new(Arc::clone(queues.ui_queue()), bus.clone());
        let loader = FallbackBundleLoader::new(self.loaders).with_bus(bus.clone());
        tracing::debug!(loaders = loader.remaining(), "host context created");
        drop(setup);

        Ok(HostContext {
            cfg: self.cfg,
            bus,
            markers,
            queues,
            runtime: self.runtime,
            loader: Arc::new(Mutex::new(loader)),
            lifecycle,
            headless: OnceLock::new(),
            handler: self.handler,
            telemetry,
            destroyed: AtomicBool::new(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Fault;
    use crate::events::{Event, EventKind};
    use crate::loader::InlineBundleLoader;
    use crate::testing::{runtime, MainLooper};
    use async_trait::async_trait;

    struct Collect(Arc<Mutex<Vec<Event>>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn subscribers_see_setup_markers_and_teardown() {
        let main = MainLooper::start();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let ctx = HostContext::builder(BridgeConfig::default(), main.handle(), runtime())
            .with_loader(InlineBundleLoader::new("inline", "inline://a", "a()"))
            .with_subscribers(vec![Arc::new(Collect(Arc::clone(&seen)))])
            .build()
            .unwrap();
        ctx.run_bundle().unwrap();
        ctx.destroy().unwrap();

        let seen = seen.lock().unwrap();
        let markers: Vec<&str> = seen
            .iter()
            .filter_map(|e| e.marker.map(|m| m.name()))
            .collect();
        assert_eq!(
            markers,
            vec![
                "CREATE_REACT_CONTEXT_START",
                "CREATE_CATALYST_INSTANCE_START",
                "CREATE_CATALYST_INSTANCE_END",
                "CREATE_REACT_CONTEXT_END",
                "RUN_JS_BUNDLE_START",
                "RUN_JS_BUNDLE_END",
            ]
        );
        assert_eq!(seen.last().map(|e| e.kind), Some(EventKind::ContextDestroyed));
    }

    #[test]
    fn custom_exception_handler_receives_queue_faults() {
        let main = MainLooper::start();
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        let ctx = HostContext::builder(BridgeConfig::default(), main.handle(), runtime())
            .with_exception_handler(Arc::new(move |f: Fault| {
                sink.lock().unwrap().push(f.origin().to_string());
            }))
            .build()
            .unwrap();

        ctx.scripting_queue().submit(|| panic!("script crash")).unwrap();
        ctx.scripting_queue().submit_sync(|| ()).unwrap();
        assert_eq!(*faults.lock().unwrap(), vec!["js".to_string()]);
    }
}
