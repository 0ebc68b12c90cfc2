//! # MessageQueueThread: a named, single-worker execution queue.
//!
//! Wraps a [`LooperHandle`] with submission APIs and fault routing.
//!
//! ## Submission forms
//! ```text
//! submit(f)            ──► async; panic → ExceptionHandler
//! submit_fallible(f)   ──► async; Err / panic → ExceptionHandler
//! submit_delayed(d, f) ──► async after `d`; panic → ExceptionHandler
//! submit_sync(f)       ──► blocks caller; value or QueueError::TaskPanicked back to caller
//! run_sync(f)          ──► submit_sync, or inline when already on the worker
//! ```
//!
//! ## Rules
//! - **Total order per queue**: submissions run in the order they reach the queue.
//! - **Fault isolation**: a failing task never kills the worker.
//! - **Idempotent quit**: the second `quit()` is a no-op.
//! - **Ownership**: queues attached to the host's looper refuse to quit.
//!
//! `submit_sync` from a task already running on the same queue deadlocks;
//! check [`MessageQueueThread::is_on_thread`] first and call inline instead.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use futures::executor::block_on;
use tokio::sync::oneshot;

use crate::error::{panic_message, BoxError, Fault, QueueError};
use crate::queue::handler::ExceptionHandler;
use crate::queue::looper::{Job, Looper, LooperHandle};
use crate::queue::spec::{QueueThreadSpec, ShutdownMode};

/// Who owns the worker behind a queue.
enum Ownership {
    /// The host's looper; never quit from here.
    Host,
    /// A thread spawned for this queue; joined on quit.
    Owned {
        join: Mutex<Option<thread::JoinHandle<()>>>,
    },
}

/// A named execution queue bound to exactly one worker.
pub struct MessageQueueThread {
    handle: LooperHandle,
    handler: Arc<dyn ExceptionHandler>,
    shutdown: ShutdownMode,
    ownership: Ownership,
}

impl MessageQueueThread {
    /// Spawns a dedicated worker thread for `spec`.
    ///
    /// Main-kind specs cannot be spawned and return [`QueueError::HostOwned`];
    /// bind those with [`attach`](Self::attach).
    pub fn spawn(
        spec: &QueueThreadSpec,
        handler: Arc<dyn ExceptionHandler>,
    ) -> Result<Self, QueueError> {
        let (looper, handle) = Looper::new(spec.name().to_string());
        if spec.is_main() {
            return Err(QueueError::HostOwned {
                queue: Arc::clone(handle.name_arc()),
            });
        }

        let mut builder = thread::Builder::new().name(spec.name().to_string());
        if let Some(bytes) = spec.stack_size() {
            builder = builder.stack_size(bytes);
        }
        let join = builder
            .spawn(move || looper.run())
            .map_err(|source| QueueError::Spawn {
                queue: Arc::clone(handle.name_arc()),
                source,
            })?;

        Ok(Self {
            handle,
            handler,
            shutdown: spec.shutdown(),
            ownership: Ownership::Owned {
                join: Mutex::new(Some(join)),
            },
        })
    }

    /// Binds a queue to a looper owned by the host.
    pub fn attach(handle: LooperHandle, handler: Arc<dyn ExceptionHandler>) -> Self {
        Self {
            handle,
            handler,
            shutdown: ShutdownMode::Drain,
            ownership: Ownership::Host,
        }
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Returns `true` if the caller runs on this queue's worker.
    pub fn is_on_thread(&self) -> bool {
        self.handle.is_on_thread()
    }

    /// Returns `true` while the queue accepts submissions.
    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Returns `true` if the worker belongs to the host.
    pub fn is_host_owned(&self) -> bool {
        matches!(self.ownership, Ownership::Host)
    }

    /// Returns `true` if both queues run on the same worker.
    pub fn shares_worker_with(&self, other: &MessageQueueThread) -> bool {
        self.handle.same_looper(&other.handle)
    }

    /// Enqueues `task` and returns immediately.
    ///
    /// A panic inside `task` is reported to the exception handler.
    pub fn submit<F>(&self, task: F) -> Result<(), QueueError>
    where
        F: FnOnce() + Send + 'static,
    {
        let job = self.guard(task);
        self.enqueue(job)
    }

    /// Enqueues a task whose `Err` is reported to the exception handler.
    pub fn submit_fallible<F>(&self, task: F) -> Result<(), QueueError>
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        let origin = Arc::clone(self.handle.name_arc());
        let handler = Arc::clone(&self.handler);
        self.submit(move || {
            if let Err(e) = task() {
                handler.handle(Fault::failed(&origin, e));
            }
        })
    }

    /// Runs `task` on the worker once `delay` has elapsed.
    ///
    /// Pending delayed tasks are dropped when the queue quits.
    pub fn submit_delayed<F>(&self, delay: Duration, task: F) -> Result<(), QueueError>
    where
        F: FnOnce() + Send + 'static,
    {
        let job = self.guard(task);
        if self.handle.send_delayed(delay, job) {
            Ok(())
        } else {
            Err(self.closed())
        }
    }

    /// Runs `task` on the worker and blocks until it has produced a value.
    ///
    /// A panic inside `task` comes back as [`QueueError::TaskPanicked`] and is
    /// not reported to the exception handler. If the queue stops before
    /// running the task, [`QueueError::Closed`] is returned.
    ///
    /// Calling this from a task running on the same queue deadlocks. Calling
    /// it from a task on another queue is fine: the reply is awaited with a
    /// plain executor, not the worker's runtime.
    ///
    /// ## Example
    /// ```rust
    /// use std::sync::Arc;
    /// use bridgevisor::{LogExceptionHandler, MessageQueueThread, QueueThreadSpec};
    ///
    /// let q = MessageQueueThread::spawn(
    ///     &QueueThreadSpec::new_background("doc"),
    ///     Arc::new(LogExceptionHandler),
    /// ).unwrap();
    /// assert_eq!(q.submit_sync(|| 6 * 7).unwrap(), 42);
    /// q.quit().unwrap();
    /// ```
    pub fn submit_sync<R, F>(&self, task: F) -> Result<R, QueueError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let _ = tx.send(catch_unwind(AssertUnwindSafe(task)));
        });
        self.enqueue(job)?;

        match block_on(rx) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(QueueError::TaskPanicked {
                queue: Arc::clone(self.handle.name_arc()),
                message: panic_message(payload.as_ref()),
            }),
            Err(_dropped) => Err(self.closed()),
        }
    }

    /// Like [`submit_sync`](Self::submit_sync), but runs `task` inline when the
    /// caller is already on this queue's worker.
    pub fn run_sync<R, F>(&self, task: F) -> Result<R, QueueError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if !self.is_on_thread() {
            return self.submit_sync(task);
        }
        catch_unwind(AssertUnwindSafe(task)).map_err(|payload| QueueError::TaskPanicked {
            queue: Arc::clone(self.handle.name_arc()),
            message: panic_message(payload.as_ref()),
        })
    }

    /// Shuts the queue down using the spec's [`ShutdownMode`].
    pub fn quit(&self) -> Result<(), QueueError> {
        self.quit_with(self.shutdown)
    }

    /// Shuts the queue down: stop accepting work, drain or discard the backlog,
    /// and join the worker (unless called from the worker itself).
    ///
    /// Idempotent; fails with [`QueueError::HostOwned`] on host-owned queues.
    pub fn quit_with(&self, mode: ShutdownMode) -> Result<(), QueueError> {
        let Ownership::Owned { join } = &self.ownership else {
            return Err(QueueError::HostOwned {
                queue: Arc::clone(self.handle.name_arc()),
            });
        };

        if !self.handle.stop(mode == ShutdownMode::Discard) {
            return Ok(());
        }
        tracing::debug!(queue = self.name(), ?mode, "queue quitting");

        if self.is_on_thread() {
            // The worker exits once the current task returns; nobody joins it.
            return Ok(());
        }

        let handle = join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(h) => h.join().map_err(|_| QueueError::WorkerPanicked {
                queue: Arc::clone(self.handle.name_arc()),
            }),
            None => Ok(()),
        }
    }

    /// Wraps `task` so that a panic is routed to the exception handler.
    fn guard<F>(&self, task: F) -> Job
    where
        F: FnOnce() + Send + 'static,
    {
        let origin = Arc::clone(self.handle.name_arc());
        let handler = Arc::clone(&self.handler);
        Box::new(move || {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
                handler.handle(Fault::panicked(&origin, payload));
            }
        })
    }

    fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        if self.handle.send(job) {
            Ok(())
        } else {
            Err(self.closed())
        }
    }

    fn closed(&self) -> QueueError {
        QueueError::Closed {
            queue: Arc::clone(self.handle.name_arc()),
        }
    }
}

impl std::fmt::Debug for MessageQueueThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueueThread")
            .field("name", &self.name())
            .field("alive", &self.is_alive())
            .field("host_owned", &self.is_host_owned())
            .finish()
    }
}

impl Drop for MessageQueueThread {
    fn drop(&mut self) {
        if let Ownership::Owned { .. } = self.ownership {
            let _ = self.quit();
        }
    }
}
