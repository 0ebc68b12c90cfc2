//! # Frame callbacks with fault routing.
//!
//! The host's choreographer calls [`FrameCallback::do_frame`] once per vsync.
//! [`GuardedFrameCallback`] adapts a fallible [`GuardedFrame`] so an `Err` or
//! a panic ends up at an [`ExceptionHandler`] instead of the render loop.
//!
//! ```text
//! tick(t) ──► FrameScheduler ──► cb₁.do_frame(t)
//!                            ├─► GuardedFrameCallback.do_frame(t)
//!                            │       └─ Err / panic ──► handler.handle(Fault)
//!                            └─► cbₙ.do_frame(t)
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{BoxError, Fault};
use crate::queue::ExceptionHandler;

/// A per-frame callback. `frame_time_nanos` is the vsync timestamp.
pub trait FrameCallback: Send + 'static {
    fn do_frame(&mut self, frame_time_nanos: i64);
}

/// Frame work that may fail.
pub trait GuardedFrame: Send + 'static {
    fn do_frame_guarded(&mut self, frame_time_nanos: i64) -> Result<(), BoxError>;
}

impl<F> GuardedFrame for F
where
    F: FnMut(i64) -> Result<(), BoxError> + Send + 'static,
{
    fn do_frame_guarded(&mut self, frame_time_nanos: i64) -> Result<(), BoxError> {
        self(frame_time_nanos)
    }
}

/// Routes failures of the wrapped frame to an exception handler.
pub struct GuardedFrameCallback<C> {
    inner: C,
    handler: Arc<dyn ExceptionHandler>,
    origin: Arc<str>,
}

impl<C: GuardedFrame> GuardedFrameCallback<C> {
    pub const DEFAULT_ORIGIN: &'static str = "frame_callback";

    pub fn new(inner: C, handler: Arc<dyn ExceptionHandler>) -> Self {
        Self {
            inner,
            handler,
            origin: Arc::from(Self::DEFAULT_ORIGIN),
        }
    }

    /// Sets the origin reported in [`Fault::origin`].
    pub fn with_origin(mut self, origin: impl Into<Arc<str>>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: GuardedFrame> FrameCallback for GuardedFrameCallback<C> {
    fn do_frame(&mut self, frame_time_nanos: i64) {
        let inner = &mut self.inner;
        match catch_unwind(AssertUnwindSafe(|| inner.do_frame_guarded(frame_time_nanos))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => self.handler.handle(Fault::failed(&self.origin, e)),
            Err(payload) => self.handler.handle(Fault::panicked(&self.origin, payload)),
        }
    }
}

/// Handle returned by [`FrameScheduler::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameCallbackId(u64);

/// Ordered set of frame callbacks driven by the host's vsync.
///
/// Callbacks run in insertion order. A raw [`FrameCallback`] that panics is
/// reported to the handler like a guarded one; the remaining callbacks still
/// run on that tick.
pub struct FrameScheduler {
    callbacks: Vec<(FrameCallbackId, Box<dyn FrameCallback>)>,
    next_id: u64,
    handler: Arc<dyn ExceptionHandler>,
    origin: Arc<str>,
}

impl FrameScheduler {
    pub fn new(handler: Arc<dyn ExceptionHandler>) -> Self {
        Self {
            callbacks: Vec::new(),
            next_id: 0,
            handler,
            origin: Arc::from("frame_scheduler"),
        }
    }

    pub fn add(&mut self, callback: impl FrameCallback) -> FrameCallbackId {
        self.next_id += 1;
        let id = FrameCallbackId(self.next_id);
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Wraps `frame` in a [`GuardedFrameCallback`] using this scheduler's handler.
    pub fn add_guarded(&mut self, frame: impl GuardedFrame) -> FrameCallbackId {
        let guarded = GuardedFrameCallback::new(frame, Arc::clone(&self.handler));
        self.add(guarded)
    }

    pub fn remove(&mut self, id: FrameCallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(cid, _)| *cid != id);
        self.callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Runs every callback once for the frame at `frame_time_nanos`.
    pub fn tick(&mut self, frame_time_nanos: i64) {
        for (_, cb) in self.callbacks.iter_mut() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| cb.do_frame(frame_time_nanos))) {
                self.handler.handle(Fault::panicked(&self.origin, payload));
            }
        }
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
