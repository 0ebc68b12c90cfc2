//! Message queues: workers, specs and the three-role configuration.
//!
//! ## Contents
//! - [`Looper`], [`LooperHandle`] single-threaded pump and its sender
//! - [`MessageQueueThread`] named queue with sync/async/delayed submission and quit
//! - [`QueueThreadSpec`], [`QueueConfigurationSpec`] value specs used for aliasing
//! - [`QueueConfiguration`] UI / native modules / scripting queues
//! - [`ExceptionHandler`] where faults from queued work end up
//!
//! ## Quick wiring
//! ```text
//! host main thread: Looper::run() ◄── LooperHandle ──► QueueConfiguration::create()
//!                                                          ├─ ui            (attach)
//!                                                          ├─ native_modules (spawn or alias)
//!                                                          └─ scripting      (spawn or alias)
//! ```

mod configuration;
mod handler;
mod looper;
mod spec;
mod thread;

pub use configuration::QueueConfiguration;
pub use handler::{ExceptionHandler, LogExceptionHandler};
pub use looper::{Looper, LooperHandle};
pub use spec::{QueueConfigurationSpec, QueueThreadKind, QueueThreadSpec, ShutdownMode};
pub use thread::MessageQueueThread;
