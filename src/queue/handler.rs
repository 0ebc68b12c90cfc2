//! # Exception handler contract
//!
//! [`ExceptionHandler`] is the single recovery point for faults raised inside
//! queued work and guarded frame callbacks. It is invoked synchronously on the
//! thread where the fault happened and must not panic.
//!
//! Any `Fn(Fault) + Send + Sync` closure is a handler:
//! ```rust
//! use std::sync::Arc;
//! use bridgevisor::{ExceptionHandler, Fault};
//!
//! let handler: Arc<dyn ExceptionHandler> = Arc::new(|fault: Fault| {
//!     eprintln!("[{}] {}", fault.as_label(), fault);
//! });
//! # let _ = handler;
//! ```

use crate::error::Fault;

/// Receives faults from queues and guarded callbacks.
pub trait ExceptionHandler: Send + Sync + 'static {
    /// Handles one fault. Must not panic.
    fn handle(&self, fault: Fault);
}

impl<F> ExceptionHandler for F
where
    F: Fn(Fault) + Send + Sync + 'static,
{
    fn handle(&self, fault: Fault) {
        self(fault)
    }
}

/// Default handler: logs the fault at `error` level and carries on.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExceptionHandler;

impl ExceptionHandler for LogExceptionHandler {
    fn handle(&self, fault: Fault) {
        tracing::error!(
            origin = fault.origin(),
            label = fault.as_label(),
            "{}",
            fault.as_message()
        );
    }
}
