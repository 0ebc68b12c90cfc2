//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::LoadError;
use crate::loader::{Bundle, ScriptRuntime};
use crate::queue::{Looper, LooperHandle, QueueThreadSpec};
use crate::tasks::TaskId;

/// A host main looper running on its own thread; quit and joined on drop.
pub(crate) struct MainLooper {
    handle: LooperHandle,
    worker: Option<thread::JoinHandle<()>>,
}

impl MainLooper {
    pub(crate) fn start() -> Self {
        let (looper, handle) = Looper::new(QueueThreadSpec::MAIN_NAME);
        let worker = thread::Builder::new()
            .name("test-main".into())
            .spawn(move || looper.run())
            .unwrap();
        Self {
            handle,
            worker: Some(worker),
        }
    }

    pub(crate) fn handle(&self) -> LooperHandle {
        self.handle.clone()
    }
}

impl Drop for MainLooper {
    fn drop(&mut self) {
        self.handle.quit();
        if let Some(w) = self.worker.take() {
            let _ = w.join();
        }
    }
}

pub(crate) type StartedTask = (TaskId, String, Option<String>);

/// Script runtime that records what it was asked to do.
#[derive(Default)]
pub(crate) struct RecordingRuntime {
    evaluated: Mutex<Vec<String>>,
    started: Mutex<Vec<StartedTask>>,
    fail: Option<Box<dyn Fn() -> LoadError + Send + Sync>>,
}

impl RecordingRuntime {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every `evaluate` fails with the error `f` builds.
    pub(crate) fn failing_with(f: impl Fn() -> LoadError + Send + Sync + 'static) -> Self {
        Self {
            fail: Some(Box::new(f)),
            ..Self::default()
        }
    }

    pub(crate) fn evaluated(&self) -> Vec<String> {
        self.evaluated.lock().unwrap().clone()
    }

    pub(crate) fn started(&self) -> Vec<StartedTask> {
        self.started.lock().unwrap().clone()
    }
}

impl ScriptRuntime for RecordingRuntime {
    fn evaluate(&self, bundle: &Bundle) -> Result<(), LoadError> {
        if let Some(fail) = &self.fail {
            return Err(fail());
        }
        self.evaluated
            .lock()
            .unwrap()
            .push(bundle.source_url().to_string());
        Ok(())
    }

    fn start_headless_task(&self, id: TaskId, task_key: &str, data: Option<&str>) {
        self.started
            .lock()
            .unwrap()
            .push((id, task_key.to_string(), data.map(str::to_string)));
    }
}

/// Convenience for tests that need the runtime behind an `Arc<dyn ScriptRuntime>`.
pub(crate) fn runtime() -> Arc<RecordingRuntime> {
    Arc::new(RecordingRuntime::new())
}
