//! # QueueConfiguration: the three role queues of a bridge.
//!
//! ```text
//! create(spec, main, handler)
//!   ├─► ui            = attach(main)                      (host-owned, never quit)
//!   ├─► scripting     = lookup(spec.scripting)      or spawn + record
//!   └─► native_modules = lookup(spec.native_modules) or spawn + record
//!
//! lookup(s): s.is_main() → ui; otherwise the queue already built for an equal spec
//!
//! destroy()
//!   └─► quit each owned queue once (aliases of ui skipped, shared queues quit once)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::QueueError;
use crate::queue::handler::ExceptionHandler;
use crate::queue::looper::LooperHandle;
use crate::queue::spec::{QueueConfigurationSpec, QueueThreadSpec};
use crate::queue::thread::MessageQueueThread;

/// The UI, native modules and scripting queues.
#[derive(Debug)]
pub struct QueueConfiguration {
    ui: Arc<MessageQueueThread>,
    native_modules: Arc<MessageQueueThread>,
    scripting: Arc<MessageQueueThread>,
    destroyed: AtomicBool,
}

impl QueueConfiguration {
    /// Builds the three queues.
    ///
    /// `main` is the host's main looper; it backs the UI queue and every role
    /// whose spec is [`QueueThreadSpec::main`].
    pub fn create(
        spec: &QueueConfigurationSpec,
        main: LooperHandle,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Result<Self, QueueError> {
        let ui = Arc::new(MessageQueueThread::attach(main, Arc::clone(&handler)));

        let mut built: HashMap<QueueThreadSpec, Arc<MessageQueueThread>> = HashMap::new();
        let scripting = resolve(&spec.scripting, &ui, &mut built, &handler)?;
        let native_modules = match resolve(&spec.native_modules, &ui, &mut built, &handler) {
            Ok(q) => q,
            Err(e) => {
                drop(scripting);
                for q in built.values() {
                    let _ = q.quit();
                }
                return Err(e);
            }
        };

        tracing::debug!(
            ui = ui.name(),
            scripting = scripting.name(),
            native_modules = native_modules.name(),
            "queue configuration created"
        );
        Ok(Self {
            ui,
            native_modules,
            scripting,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Queue bound to the host's main looper.
    pub fn ui_queue(&self) -> &Arc<MessageQueueThread> {
        &self.ui
    }

    /// Queue running native module calls.
    pub fn native_modules_queue(&self) -> &Arc<MessageQueueThread> {
        &self.native_modules
    }

    /// Queue running the script runtime.
    pub fn scripting_queue(&self) -> &Arc<MessageQueueThread> {
        &self.scripting
    }

    /// Quits the owned queues; the UI looper is left to the host.
    ///
    /// Idempotent. Every owned queue is attempted; the first error is returned.
    pub fn destroy(&self) -> Result<(), QueueError> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut owned: Vec<&Arc<MessageQueueThread>> = Vec::with_capacity(2);
        for q in [&self.native_modules, &self.scripting] {
            if q.is_host_owned() || owned.iter().any(|o| Arc::ptr_eq(o, q)) {
                continue;
            }
            owned.push(q);
        }

        let mut first_err = None;
        for q in owned {
            if let Err(e) = q.quit() {
                tracing::warn!(queue = q.name(), error = %e, "queue quit failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn resolve(
    spec: &QueueThreadSpec,
    ui: &Arc<MessageQueueThread>,
    built: &mut HashMap<QueueThreadSpec, Arc<MessageQueueThread>>,
    handler: &Arc<dyn ExceptionHandler>,
) -> Result<Arc<MessageQueueThread>, QueueError> {
    if spec.is_main() {
        return Ok(Arc::clone(ui));
    }
    if let Some(q) = built.get(spec) {
        return Ok(Arc::clone(q));
    }
    let q = Arc::new(MessageQueueThread::spawn(spec, Arc::clone(handler))?);
    built.insert(spec.clone(), Arc::clone(&q));
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::handler::LogExceptionHandler;
    use crate::queue::looper::Looper;
    use std::thread;

    fn with_main<T>(f: impl FnOnce(LooperHandle) -> T) -> T {
        let (looper, main) = Looper::new(QueueThreadSpec::MAIN_NAME);
        let worker = thread::spawn(move || looper.run());
        let out = f(main.clone());
        main.quit();
        worker.join().unwrap();
        out
    }

    #[test]
    fn default_spec_builds_three_distinct_queues() {
        with_main(|main| {
            let cfg = QueueConfiguration::create(
                &QueueConfigurationSpec::default(),
                main,
                Arc::new(LogExceptionHandler),
            )
            .unwrap();

            assert!(cfg.ui_queue().is_host_owned());
            assert_eq!(cfg.scripting_queue().name(), "js");
            assert_eq!(cfg.native_modules_queue().name(), "native_modules");
            assert!(!cfg.scripting_queue().shares_worker_with(cfg.native_modules_queue()));

            let ui_thread = cfg.ui_queue().submit_sync(|| thread::current().id()).unwrap();
            let js_thread = cfg.scripting_queue().submit_sync(|| thread::current().id()).unwrap();
            assert_ne!(ui_thread, js_thread);

            cfg.destroy().unwrap();
            assert!(!cfg.scripting_queue().is_alive());
            assert!(!cfg.native_modules_queue().is_alive());
            assert!(cfg.ui_queue().is_alive());
        });
    }

    #[test]
    fn native_modules_on_main_aliases_ui_and_survives_destroy() {
        with_main(|main| {
            let spec = QueueConfigurationSpec::default().with_native_modules_on_main();
            let cfg = QueueConfiguration::create(&spec, main, Arc::new(LogExceptionHandler)).unwrap();

            assert!(Arc::ptr_eq(cfg.native_modules_queue(), cfg.ui_queue()));
            cfg.destroy().unwrap();

            assert!(cfg.ui_queue().is_alive());
            assert_eq!(cfg.native_modules_queue().submit_sync(|| 3).unwrap(), 3);
            assert!(!cfg.scripting_queue().is_alive());
        });
    }

    #[test]
    fn equal_specs_share_one_queue_destroyed_once() {
        with_main(|main| {
            let shared = QueueThreadSpec::new_background("shared");
            let spec = QueueConfigurationSpec::new(shared.clone(), shared);
            let cfg = QueueConfiguration::create(&spec, main, Arc::new(LogExceptionHandler)).unwrap();

            assert!(Arc::ptr_eq(cfg.scripting_queue(), cfg.native_modules_queue()));
            cfg.destroy().unwrap();
            cfg.destroy().unwrap();
            assert!(!cfg.scripting_queue().is_alive());
        });
    }
}
