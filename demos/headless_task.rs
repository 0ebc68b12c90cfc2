//! # Example: Headless tasks
//!
//! Starts background tasks while the host is paused, lets one of them time
//! out and finishes the other from the "script" side. Then shows a task being
//! refused while the host is in the foreground.
//!
//! Bus events are printed by the built-in `LogWriter`.
//!
//! ```bash
//! RUST_LOG=info cargo run --example headless_task --features logging
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bridgevisor::{
    BridgeConfig, Bundle, HeadlessTaskConfig, HeadlessTaskEventListener, HostContext, HostId,
    InlineBundleLoader, LifecycleEventListener, LoadError, LogWriter, Looper, QueueThreadSpec,
    ScriptRuntime, Subscribe, TaskId,
};
use tracing_subscriber::EnvFilter;

struct Engine;

impl ScriptRuntime for Engine {
    fn evaluate(&self, bundle: &Bundle) -> Result<(), LoadError> {
        println!("[engine] evaluated {}", bundle.source_url());
        Ok(())
    }

    fn start_headless_task(&self, id: TaskId, task_key: &str, data: Option<&str>) {
        println!("[engine] running {task_key} as {id} with {data:?}");
    }
}

struct TaskPrinter;

impl HeadlessTaskEventListener for TaskPrinter {
    fn on_headless_task_start(&self, id: TaskId) {
        println!("[listener] started {id}");
    }

    fn on_headless_task_finish(&self, id: TaskId) {
        println!("[listener] finished {id}");
    }
}

struct HostPrinter;

impl LifecycleEventListener for HostPrinter {
    fn on_host_resume(&self) {
        println!("[host] resume");
    }
    fn on_host_pause(&self) {
        println!("[host] pause");
    }
    fn on_host_destroy(&self) {
        println!("[host] destroy");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (looper, main) = Looper::new(QueueThreadSpec::MAIN_NAME);
    let ui_thread = thread::spawn(move || looper.run());

    let cfg = BridgeConfig {
        task_timeout: Duration::from_millis(200),
        ..BridgeConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let ctx = HostContext::builder(cfg.clone(), main.clone(), Arc::new(Engine))
        .with_loader(InlineBundleLoader::new("inline", "inline://app", "app()"))
        .with_subscribers(subs)
        .build()?;
    ctx.run_bundle()?;

    let host = HostId::new(1);
    ctx.add_lifecycle_event_listener(Arc::new(HostPrinter))?;
    ctx.on_host_resume(host)?;
    ctx.on_host_pause(host)?;

    let tasks = ctx.headless_tasks()?;
    tasks.add_task_event_listener(Arc::new(TaskPrinter));

    let sync = tasks.start_task(
        HeadlessTaskConfig::with_defaults("SyncContacts", &cfg).with_data(r#"{"full":false}"#),
    )?;
    let upload = tasks.start_task(HeadlessTaskConfig::new("UploadLogs"))?;

    // The script side reports completion of the upload; the sync task times out.
    tasks.notify_task_finished(upload)?;
    thread::sleep(Duration::from_millis(300));
    println!("sync running after timeout: {}", tasks.is_task_running(sync));

    ctx.on_host_resume(host)?;
    match tasks.start_task(HeadlessTaskConfig::new("Prefetch")) {
        Ok(id) => println!("unexpectedly started {id}"),
        Err(e) => println!("refused: {e}"),
    }
    let fg = tasks.start_task(HeadlessTaskConfig::new("Prefetch").allowed_in_foreground(true))?;
    tasks.finish_task(fg)?;

    ctx.on_host_destroy(host)?;
    ctx.destroy()?;

    main.quit();
    let _ = ui_thread.join();
    Ok(())
}
