//! # bridgevisor
//!
//! **bridgevisor** is the scheduling core of a script-driven host: it runs a
//! script engine, native modules and the UI on separate message queues, loads
//! the script bundle from a chain of fallback sources and tracks headless
//! (background) script tasks.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                      host main thread
//!                    ┌──────────────────┐
//!                    │   Looper::run()  │◄────── LooperHandle
//!                    └────────┬─────────┘            │
//!                             │ ui queue             ▼
//! ┌───────────────────────────┴──────────────────────────────────────┐
//! │  HostContext                                                     │
//! │  - QueueConfiguration { ui, native_modules, scripting }          │
//! │  - FallbackBundleLoader   (runs on scripting)                    │
//! │  - LifecycleTracker       (runs on ui)                           │
//! │  - HeadlessTaskContext    (runs on ui, lazily created)           │
//! │  - Markers / Bus                                                 │
//! └──────┬──────────────────────┬─────────────────────────┬──────────┘
//!        ▼                      ▼                         ▼
//!  ┌────────────┐       ┌───────────────┐         ┌───────────────┐
//!  │ "js" queue │       │ native_modules│         │  Bus (events) │
//!  │ ScriptRun- │       │     queue     │         └───────┬───────┘
//!  │ time calls │       └───────────────┘                 ▼
//!  └────────────┘                               telemetry thread
//!                                                         ▼
//!                                             SubscriberSet ──► LogWriter, ...
//! ```
//!
//! ### Bundle loading
//! ```text
//! run_bundle() ── RUN_JS_BUNDLE_START
//!   └─► scripting.run_sync(loader.load_script(runtime))
//!         top strategy ── Ok ─────────────► BundleLoaded (chain parks here)
//!                      ── Recoverable ────► pop, LoaderFellBack, try next
//!                      ── Fatal ──────────► BundleLoadFailed
//!         stack empty  ───────────────────► Exhausted { recovered failures }
//! ── RUN_JS_BUNDLE_END
//! ```
//!
//! ### Headless task
//! ```text
//! start_task(cfg) ──► ui: reject if resumed && !allowed_in_foreground
//!                         id = next free id (wraps), register
//!                         listeners.on_headless_task_start(id)
//!                         scripting: runtime.start_headless_task(id, key, data)
//!                         ui (delayed): timeout ──► finish as TimedOut
//! finish_task(id) ──► ui: remove, cancel timeout, listeners.on_headless_task_finish(id)
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types                                       |
//! |-----------------|--------------------------------------------------------------|-------------------------------------------------|
//! | **Queues**      | Named single-thread queues with sync/async/delayed submission | [`MessageQueueThread`], [`QueueConfiguration`]  |
//! | **Loading**     | Ordered bundle sources with recoverable fallback             | [`FallbackBundleLoader`], [`BundleLoader`]      |
//! | **Tasks**       | Headless task ids, timeouts and listeners                    | [`HeadlessTaskContext`], [`HeadlessTaskConfig`] |
//! | **Lifecycle**   | Host resume/pause/destroy fan-out                            | [`LifecycleEventListener`], [`HostId`]          |
//! | **Frames**      | Per-frame callbacks with fault routing                       | [`GuardedFrameCallback`], [`FrameScheduler`]    |
//! | **Markers**     | Start/end instrumentation pairs                              | [`Phase`], [`Marker`], [`Markers`]              |
//! | **Events**      | Broadcast bus and async subscribers                          | [`Bus`], [`Event`], [`Subscribe`]               |
//! | **Errors**      | Typed errors with stable labels                              | [`QueueError`], [`LoadError`], [`BridgeError`]  |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use bridgevisor::{
//!     Bundle, BridgeConfig, HostContext, InlineBundleLoader, LoadError, Looper,
//!     QueueThreadSpec, ScriptRuntime, TaskId,
//! };
//!
//! struct Engine;
//!
//! impl ScriptRuntime for Engine {
//!     fn evaluate(&self, bundle: &Bundle) -> Result<(), LoadError> {
//!         println!("evaluating {}", bundle.source_url());
//!         Ok(())
//!     }
//!     fn start_headless_task(&self, id: TaskId, key: &str, _data: Option<&str>) {
//!         println!("task {id} ({key})");
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (looper, main) = Looper::new(QueueThreadSpec::MAIN_NAME);
//!     let ui_thread = thread::spawn(move || looper.run());
//!
//!     let ctx = HostContext::builder(BridgeConfig::default(), main.clone(), Arc::new(Engine))
//!         .with_loader(InlineBundleLoader::new("inline", "inline://index", "run()"))
//!         .build()?;
//!     ctx.run_bundle()?;
//!     ctx.destroy()?;
//!
//!     main.quit();
//!     ui_thread.join().ok();
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod frame;
mod listeners;
mod loader;
mod markers;
mod queue;
mod subscribers;
mod tasks;
mod view_index;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{
    BridgeConfig, HostContext, HostContextBuilder, HostId, LifecycleEventListener, LifecycleState,
};
pub use error::{
    BoxError, BridgeError, Fault, HeadlessTaskError, LoadError, QueueError, RecoveredFailure,
    SharedError, RECOVERABLE_MARKER,
};
pub use events::{Bus, Event, EventKind};
pub use frame::{FrameCallback, FrameCallbackId, FrameScheduler, GuardedFrame, GuardedFrameCallback};
pub use loader::{
    Bundle, BundleLoader, BundleReadError, FallbackBundleLoader, FileBundleLoader,
    InlineBundleLoader, LoaderFn, ScriptRuntime,
};
pub use markers::{Edge, Marker, Markers, Phase, PhaseSpan};
pub use queue::{
    ExceptionHandler, LogExceptionHandler, Looper, LooperHandle, MessageQueueThread,
    QueueConfiguration, QueueConfigurationSpec, QueueThreadKind, QueueThreadSpec, ShutdownMode,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{HeadlessTaskConfig, HeadlessTaskContext, HeadlessTaskEventListener, TaskId};
pub use view_index::{sort_by_index, ViewAtIndex};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
