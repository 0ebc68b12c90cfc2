//! # Example: Bundle fallback
//!
//! Tries a bundle file that does not exist, then a strategy that reports a
//! recoverable failure as text, then an inline bundle. Prints the fallback
//! history afterwards.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example bundle_fallback
//! ```

use std::error::Error as _;
use std::sync::Arc;
use std::thread;

use bridgevisor::{
    BridgeConfig, Bundle, FileBundleLoader, HostContext, InlineBundleLoader, LoadError, LoaderFn,
    Looper, QueueThreadSpec, ScriptRuntime, TaskId, RECOVERABLE_MARKER,
};
use tracing_subscriber::EnvFilter;

struct PrintingEngine;

impl ScriptRuntime for PrintingEngine {
    fn evaluate(&self, bundle: &Bundle) -> Result<(), LoadError> {
        println!("[engine] evaluating {} ({} bytes)", bundle.source_url(), bundle.source().len());
        Ok(())
    }

    fn start_headless_task(&self, id: TaskId, task_key: &str, _data: Option<&str>) {
        println!("[engine] task {id} {task_key}");
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (looper, main) = Looper::new(QueueThreadSpec::MAIN_NAME);
    let ui_thread = thread::spawn(move || looper.run());

    let ctx = HostContext::builder(BridgeConfig::default(), main.clone(), Arc::new(PrintingEngine))
        .with_loader(FileBundleLoader::new("/nonexistent/index.bundle"))
        .with_loader(LoaderFn::new("dev-server", |_rt: &dyn ScriptRuntime| -> Result<Bundle, LoadError> {
            Err(LoadError::from_message(format!(
                "{RECOVERABLE_MARKER}: packager not running"
            )))
        }))
        .with_loader(InlineBundleLoader::new(
            "embedded",
            "assets://index.bundle",
            "__startApp()",
        ))
        .build()?;

    let bundle = ctx.run_bundle()?;
    println!("loaded {}", bundle.source_url());

    ctx.destroy()?;

    // A chain with nothing usable left reports everything it tried.
    let ctx = HostContext::builder(BridgeConfig::default(), main.clone(), Arc::new(PrintingEngine))
        .with_loader(FileBundleLoader::new("/nonexistent/a.bundle"))
        .with_loader(FileBundleLoader::new("/nonexistent/b.bundle"))
        .build()?;
    if let Err(e) = ctx.run_bundle() {
        println!("failed: {e}");
        let mut cause = e.source();
        while let Some(c) = cause {
            println!("  caused by: {c}");
            cause = c.source();
        }
    }
    ctx.destroy()?;

    main.quit();
    let _ = ui_thread.join();
    Ok(())
}
