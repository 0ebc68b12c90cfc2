//! # HeadlessTaskContext: registry of background script tasks.
//!
//! One instance per host context. Tasks are keyed by monotonically increasing
//! [`TaskId`]s (first id = 1) and live from `start_task` until their first
//! completion, explicit or by timeout.
//!
//! ## Architecture
//! ```text
//! any thread ──► start_task(config) ──run_sync──► UI queue
//!                                                   ├─► foreground check (lifecycle)
//!                                                   ├─► allocate id, register
//!                                                   ├─► listeners.on_headless_task_start(id)
//!                                                   ├─► scripting.submit(runtime.start_headless_task)
//!                                                   └─► ui.submit_delayed(timeout) ──► finish(id, timed out)
//!
//! any thread ──► finish_task(id) ──run_sync──► UI queue
//!                                                   ├─► unknown id → no-op
//!                                                   ├─► remove, cancel timeout
//!                                                   └─► listeners.on_headless_task_finish(id)
//! ```
//!
//! ## Rules
//! - All registry mutations and listener fan-out run on the UI queue.
//! - Finishing twice (or after a timeout fired) is a no-op.
//! - A listener panic is caught and published; the other listeners still run.
//! - Once the owning host context is destroyed no task can start and pending
//!   timeouts never fire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::core::LifecycleTracker;
use crate::error::{HeadlessTaskError, QueueError};
use crate::events::{Bus, Event, EventKind};
use crate::listeners::ListenerSet;
use crate::loader::ScriptRuntime;
use crate::queue::MessageQueueThread;
use crate::tasks::{HeadlessTaskConfig, HeadlessTaskEventListener, TaskId};

/// A registered task.
struct ActiveTask {
    key: Arc<str>,
    started_at: Instant,
    /// Cancels the scheduled timeout, if one was scheduled.
    timeout: Option<(Duration, CancellationToken)>,
}

#[derive(Default)]
struct Registry {
    last_id: u32,
    active: HashMap<TaskId, ActiveTask>,
}

impl Registry {
    /// Wraps past `u32::MAX`, skipping 0 and ids that are still active.
    fn next_id(&mut self) -> TaskId {
        loop {
            self.last_id = self.last_id.wrapping_add(1);
            let id = TaskId::new(self.last_id);
            if self.last_id != 0 && !self.active.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Why a task left the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FinishReason {
    Requested,
    TimedOut,
}

struct Inner {
    ui: Arc<MessageQueueThread>,
    scripting: Arc<MessageQueueThread>,
    runtime: Arc<dyn ScriptRuntime>,
    lifecycle: Arc<LifecycleTracker>,
    bus: Bus,
    registry: Mutex<Registry>,
    listeners: ListenerSet<dyn HeadlessTaskEventListener>,
    shut_down: AtomicBool,
}

/// Tracks headless tasks of one host context. Cheap to clone.
#[derive(Clone)]
pub struct HeadlessTaskContext {
    inner: Arc<Inner>,
}

impl HeadlessTaskContext {
    pub(crate) fn new(
        ui: Arc<MessageQueueThread>,
        scripting: Arc<MessageQueueThread>,
        runtime: Arc<dyn ScriptRuntime>,
        lifecycle: Arc<LifecycleTracker>,
        bus: Bus,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                ui,
                scripting,
                runtime,
                lifecycle,
                bus,
                registry: Mutex::new(Registry::default()),
                listeners: ListenerSet::new(),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Registers and starts a task.
    ///
    /// Fails with [`HeadlessTaskError::NotAllowedInForeground`] if the host is
    /// resumed and the task did not opt into foreground execution.
    pub fn start_task(&self, config: HeadlessTaskConfig) -> Result<TaskId, HeadlessTaskError> {
        let inner = Arc::clone(&self.inner);
        self.inner.ui.run_sync(move || inner.start(config))?
    }

    /// Finishes a task. Returns `Ok(false)` if `id` is not running.
    pub fn finish_task(&self, id: TaskId) -> Result<bool, HeadlessTaskError> {
        let inner = Arc::clone(&self.inner);
        Ok(self
            .inner
            .ui
            .run_sync(move || inner.finish(id, FinishReason::Requested))?)
    }

    /// Completion signal coming from the script side.
    ///
    /// Same as [`finish_task`](Self::finish_task), but an unknown id is logged.
    pub fn notify_task_finished(&self, id: TaskId) -> Result<(), HeadlessTaskError> {
        if !self.finish_task(id)? {
            tracing::warn!(task_id = id.get(), "script finished a task that is not running");
        }
        Ok(())
    }

    /// Returns `true` while `id` is registered.
    pub fn is_task_running(&self, id: TaskId) -> bool {
        let inner = Arc::clone(&self.inner);
        self.inner
            .ui
            .run_sync(move || inner.registry().active.contains_key(&id))
            .unwrap_or(false)
    }

    /// Returns `true` if any task is registered.
    pub fn has_active_tasks(&self) -> bool {
        let inner = Arc::clone(&self.inner);
        self.inner
            .ui
            .run_sync(move || !inner.registry().active.is_empty())
            .unwrap_or(false)
    }

    /// Ids of the registered tasks, ascending.
    pub fn active_tasks(&self) -> Vec<TaskId> {
        let inner = Arc::clone(&self.inner);
        self.inner
            .ui
            .run_sync(move || {
                let mut ids: Vec<TaskId> = inner.registry().active.keys().copied().collect();
                ids.sort_unstable();
                ids
            })
            .unwrap_or_default()
    }

    /// Adds a listener; returns `false` if it was already registered.
    pub fn add_task_event_listener(&self, listener: Arc<dyn HeadlessTaskEventListener>) -> bool {
        self.inner.listeners.add(listener)
    }

    /// Removes a listener; returns `false` if it was not registered.
    pub fn remove_task_event_listener(&self, listener: &Arc<dyn HeadlessTaskEventListener>) -> bool {
        self.inner.listeners.remove(listener)
    }

    /// Cancels pending timeouts, drops every task and listener, refuses new tasks.
    ///
    /// Listeners are not notified of the dropped tasks. Idempotent.
    pub(crate) fn shutdown(&self) -> Result<(), QueueError> {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let clear = move || {
            let dropped: Vec<ActiveTask> = {
                let mut reg = inner.registry();
                reg.active.drain().map(|(_, t)| t).collect()
            };
            for task in &dropped {
                if let Some((_, token)) = &task.timeout {
                    token.cancel();
                }
            }
            inner.listeners.clear();
            if !dropped.is_empty() {
                tracing::debug!(dropped = dropped.len(), "headless tasks dropped on shutdown");
            }
        };
        if self.inner.ui.is_alive() {
            self.inner.ui.run_sync(clear)
        } else {
            clear();
            Ok(())
        }
    }
}

impl Inner {
    fn start(self: Arc<Self>, config: HeadlessTaskConfig) -> Result<TaskId, HeadlessTaskError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(HeadlessTaskError::ContextDestroyed);
        }
        if self.lifecycle.is_resumed() && !config.is_allowed_in_foreground() {
            let key = Arc::clone(config.task_key_arc());
            tracing::warn!(task_key = %key, "refusing headless task while host is in the foreground");
            self.bus.publish(
                Event::new(EventKind::TaskRejected)
                    .with_name(Arc::clone(&key))
                    .with_reason("not allowed in foreground"),
            );
            return Err(HeadlessTaskError::NotAllowedInForeground { task_key: key });
        }

        let scheduled = config.scheduled_timeout();
        let token = scheduled.map(|_| CancellationToken::new());
        let id = {
            let mut reg = self.registry();
            let id = reg.next_id();
            reg.active.insert(
                id,
                ActiveTask {
                    key: Arc::clone(config.task_key_arc()),
                    started_at: Instant::now(),
                    timeout: scheduled.zip(token.clone()),
                },
            );
            id
        };

        let mut started = Event::new(EventKind::TaskStarted)
            .with_task_id(id)
            .with_name(Arc::clone(config.task_key_arc()));
        if let Some(d) = scheduled {
            started = started.with_timeout(d);
        }
        self.bus.publish(started);
        tracing::debug!(task_id = id.get(), task_key = config.task_key(), "headless task started");

        self.notify(id, "on_headless_task_start", |l| l.on_headless_task_start(id));

        let runtime = Arc::clone(&self.runtime);
        let dispatched = self.scripting.submit(move || {
            runtime.start_headless_task(id, config.task_key(), config.data());
        });
        if let Err(e) = dispatched {
            tracing::error!(task_id = id.get(), error = %e, "could not dispatch headless task to the scripting queue");
        }

        if let (Some(delay), Some(token)) = (scheduled, token) {
            let weak: Weak<Inner> = Arc::downgrade(&self);
            let armed = self.ui.submit_delayed(delay, move || {
                if token.is_cancelled() {
                    return;
                }
                if let Some(inner) = weak.upgrade() {
                    inner.finish(id, FinishReason::TimedOut);
                }
            });
            if let Err(e) = armed {
                tracing::error!(task_id = id.get(), error = %e, "could not schedule headless task timeout");
            }
        }
        Ok(id)
    }

    fn finish(&self, id: TaskId, reason: FinishReason) -> bool {
        let Some(task) = self.registry().active.remove(&id) else {
            return false;
        };

        let mut ev = match reason {
            FinishReason::Requested => Event::new(EventKind::TaskFinished),
            FinishReason::TimedOut => Event::new(EventKind::TaskTimedOut),
        }
        .with_task_id(id)
        .with_name(Arc::clone(&task.key));
        if let Some((d, token)) = &task.timeout {
            token.cancel();
            if reason == FinishReason::TimedOut {
                ev = ev.with_timeout(*d);
            }
        }
        self.bus.publish(ev);
        tracing::debug!(
            task_id = id.get(),
            task_key = %task.key,
            ?reason,
            ran_for = ?task.started_at.elapsed(),
            "headless task finished"
        );

        self.notify(id, "on_headless_task_finish", |l| l.on_headless_task_finish(id));
        true
    }

    fn notify(&self, id: TaskId, hook: &'static str, f: impl FnMut(&dyn HeadlessTaskEventListener)) {
        for message in self.listeners.notify(f) {
            tracing::error!(task_id = id.get(), hook, panic = %message, "task listener panicked");
            self.bus.publish(
                Event::new(EventKind::ListenerPanicked)
                    .with_task_id(id)
                    .with_name(hook)
                    .with_reason(message),
            );
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
