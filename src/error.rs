//! Error types used by the bridge queues, loaders and task registry.
//!
//! This module defines the error enums of the crate:
//!
//! - [`QueueError`]: failures of the message queue machinery itself.
//! - [`Fault`]: faults raised *inside* queued work or frame callbacks; these are
//!   what an [`ExceptionHandler`](crate::ExceptionHandler) receives.
//! - [`LoadError`]: failures of bundle loader strategies, including the
//!   recoverable/fatal split that drives fallback.
//! - [`HeadlessTaskError`]: rejected or undeliverable headless task requests.
//! - [`BridgeError`]: errors surfaced by [`HostContext`](crate::HostContext).
//!
//! All of them provide `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` helpers.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error accepted from user code (loaders, runtimes, fallible tasks).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Shared error handle; recovered loader failures are kept in this form so the
/// fallback history can be rebuilt any number of times.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Message prefix that marks a loader failure as recoverable.
///
/// Only used by [`LoadError::from_message`] for strategies that can only report
/// plain text (e.g. an embedded script engine); typed code should construct
/// [`LoadError::Recoverable`] directly.
pub const RECOVERABLE_MARKER: &str = "bridgevisor::Recoverable";

/// # Errors produced by the message queue machinery.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue has been quit (or its worker is gone); nothing more may be submitted.
    #[error("queue '{queue}' is no longer accepting work")]
    Closed {
        /// Queue name.
        queue: Arc<str>,
    },

    /// The queue runs on the host's looper and cannot be quit from here.
    #[error("queue '{queue}' is owned by the host and cannot be quit")]
    HostOwned {
        /// Queue name.
        queue: Arc<str>,
    },

    /// The worker thread could not be started.
    #[error("failed to spawn worker for queue '{queue}': {source}")]
    Spawn {
        /// Queue name.
        queue: Arc<str>,
        /// OS error from the thread builder.
        #[source]
        source: std::io::Error,
    },

    /// A task submitted with `submit_sync` panicked on the worker.
    #[error("task on queue '{queue}' panicked: {message}")]
    TaskPanicked {
        /// Queue name.
        queue: Arc<str>,
        /// Panic payload rendered as text.
        message: String,
    },

    /// The worker thread itself died while being joined.
    #[error("worker of queue '{queue}' panicked")]
    WorkerPanicked {
        /// Queue name.
        queue: Arc<str>,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bridgevisor::QueueError;
    ///
    /// let err = QueueError::Closed { queue: "js".into() };
    /// assert_eq!(err.as_label(), "queue_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Closed { .. } => "queue_closed",
            QueueError::HostOwned { .. } => "queue_host_owned",
            QueueError::Spawn { .. } => "queue_spawn_failed",
            QueueError::TaskPanicked { .. } => "queue_task_panicked",
            QueueError::WorkerPanicked { .. } => "queue_worker_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            QueueError::Closed { queue } => format!("closed: {queue}"),
            QueueError::HostOwned { queue } => format!("host owned: {queue}"),
            QueueError::Spawn { queue, source } => format!("spawn {queue}: {source}"),
            QueueError::TaskPanicked { queue, message } => format!("panic on {queue}: {message}"),
            QueueError::WorkerPanicked { queue } => format!("worker panic: {queue}"),
        }
    }
}

/// # A fault raised inside queued work or a guarded callback.
///
/// Delivered to an [`ExceptionHandler`](crate::ExceptionHandler) on the thread
/// where it occurred.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Fault {
    /// The work panicked.
    #[error("{origin}: panicked: {message}")]
    Panicked {
        /// Queue name or callback origin.
        origin: Arc<str>,
        /// Panic payload rendered as text.
        message: String,
    },

    /// The work returned an error.
    #[error("{origin}: failed: {source}")]
    Failed {
        /// Queue name or callback origin.
        origin: Arc<str>,
        /// Error returned by the work.
        #[source]
        source: BoxError,
    },
}

impl Fault {
    pub(crate) fn panicked(origin: &Arc<str>, payload: Box<dyn Any + Send>) -> Self {
        Fault::Panicked {
            origin: Arc::clone(origin),
            message: panic_message(payload.as_ref()),
        }
    }

    pub(crate) fn failed(origin: &Arc<str>, source: BoxError) -> Self {
        Fault::Failed {
            origin: Arc::clone(origin),
            source,
        }
    }

    /// Where the fault happened (queue name or callback origin).
    pub fn origin(&self) -> &str {
        match self {
            Fault::Panicked { origin, .. } | Fault::Failed { origin, .. } => origin,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Fault::Panicked { .. } => "fault_panicked",
            Fault::Failed { .. } => "fault_failed",
        }
    }

    /// Returns a human-readable message with details about the fault.
    pub fn as_message(&self) -> String {
        match self {
            Fault::Panicked { message, .. } => format!("panic: {message}"),
            Fault::Failed { source, .. } => format!("error: {source}"),
        }
    }
}

/// # Errors produced by bundle loader strategies.
///
/// The variant decides what the fallback chain does:
/// - [`LoadError::Recoverable`] → pop the strategy and try the next one;
/// - [`LoadError::Fatal`] → abort immediately, unchanged;
/// - [`LoadError::Exhausted`] → synthesized once every strategy was popped.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoadError {
    /// The source is unavailable in a way another source may cover (e.g. missing file).
    #[error("recoverable: {source}")]
    Recoverable {
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// Anything else (e.g. a malformed bundle). Never triggers fallback.
    #[error("fatal: {source}")]
    Fatal {
        /// Underlying cause.
        #[source]
        source: BoxError,
    },

    /// No strategy is left. The source chain walks every recovered failure,
    /// first failure first.
    #[error("no fallback options available")]
    Exhausted {
        /// Head of the recovered failure chain (`None` if no strategy was ever configured).
        #[source]
        history: Option<Box<RecoveredFailure>>,
    },
}

impl LoadError {
    /// Wraps `err` as a recoverable failure.
    pub fn recoverable(err: impl Into<BoxError>) -> Self {
        LoadError::Recoverable { source: err.into() }
    }

    /// Wraps `err` as a fatal failure.
    pub fn fatal(err: impl Into<BoxError>) -> Self {
        LoadError::Fatal { source: err.into() }
    }

    /// Classifies a plain-text failure by [`RECOVERABLE_MARKER`] prefix.
    ///
    /// # Example
    /// ```
    /// use bridgevisor::{LoadError, RECOVERABLE_MARKER};
    ///
    /// let e = LoadError::from_message(format!("{RECOVERABLE_MARKER}: asset missing"));
    /// assert!(e.is_recoverable());
    ///
    /// let e = LoadError::from_message("syntax error at 1:4");
    /// assert!(!e.is_recoverable());
    /// ```
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.starts_with(RECOVERABLE_MARKER) {
            LoadError::recoverable(message)
        } else {
            LoadError::fatal(message)
        }
    }

    /// Returns `true` for [`LoadError::Recoverable`].
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LoadError::Recoverable { .. })
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::Recoverable { .. } => "load_recoverable",
            LoadError::Fatal { .. } => "load_fatal",
            LoadError::Exhausted { .. } => "load_exhausted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoadError::Recoverable { source } => format!("recoverable: {source}"),
            LoadError::Fatal { source } => format!("fatal: {source}"),
            LoadError::Exhausted { history } => {
                let n = history.as_deref().map_or(0, RecoveredFailure::count);
                format!("exhausted after {n} recovered failure(s)")
            }
        }
    }
}

/// One link of the fallback history carried by [`LoadError::Exhausted`].
///
/// Each recovered failure contributes a header link (`loader 'x' failed: ...`)
/// followed by one link per cause of its error, so walking `source()` visits
/// A, A's causes, B, B's causes, and so on.
#[derive(Debug)]
pub struct RecoveredFailure {
    loader: Arc<str>,
    error: SharedError,
    /// 0 for the header; `k` renders the k-th cause of `error`.
    depth: usize,
    next: Option<Box<RecoveredFailure>>,
}

impl RecoveredFailure {
    pub(crate) fn chain(failures: &[(Arc<str>, SharedError)]) -> Option<Box<Self>> {
        failures.iter().rev().fold(None, |mut next, (loader, error)| {
            let causes = causes_of(error.as_ref()).count();
            for depth in (0..=causes).rev() {
                next = Some(Box::new(RecoveredFailure {
                    loader: Arc::clone(loader),
                    error: Arc::clone(error),
                    depth,
                    next,
                }));
            }
            next
        })
    }

    /// Name of the strategy that failed.
    pub fn loader(&self) -> &str {
        &self.loader
    }

    /// The error the strategy failed with.
    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Returns `true` for a link that renders one of the error's causes.
    pub fn is_cause(&self) -> bool {
        self.depth > 0
    }

    /// The next recovered failure in occurrence order, skipping cause links.
    pub fn next(&self) -> Option<&RecoveredFailure> {
        std::iter::successors(self.next.as_deref(), |f| f.next.as_deref()).find(|f| !f.is_cause())
    }

    pub(crate) fn count(&self) -> usize {
        std::iter::successors(Some(self), |f| f.next()).count()
    }
}

fn causes_of<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(err.source(), |&e: &&'a (dyn StdError + 'static)| e.source())
}

impl fmt::Display for RecoveredFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.depth == 0 {
            return write!(f, "loader '{}' failed: {}", self.loader, self.error);
        }
        match causes_of(self.error.as_ref()).nth(self.depth - 1) {
            Some(cause) => write!(f, "{cause}"),
            None => Ok(()),
        }
    }
}

impl StdError for RecoveredFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.next.as_deref().map(|next| next as &(dyn StdError + 'static))
    }
}

/// # Errors produced by the headless task registry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HeadlessTaskError {
    /// The host is in the foreground and the task did not opt into running there.
    #[error("task '{task_key}' may not start while the host is in the foreground")]
    NotAllowedInForeground {
        /// Key of the rejected task.
        task_key: Arc<str>,
    },

    /// The UI queue refused the marshalled call.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The owning host context was destroyed.
    #[error("host context destroyed")]
    ContextDestroyed,
}

impl HeadlessTaskError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HeadlessTaskError::NotAllowedInForeground { .. } => "task_not_allowed_in_foreground",
            HeadlessTaskError::Queue(e) => e.as_label(),
            HeadlessTaskError::ContextDestroyed => "task_context_destroyed",
        }
    }
}

/// # Errors surfaced by [`HostContext`](crate::HostContext).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Queue setup, teardown or marshalling failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Bundle loading failed (fatal or exhausted).
    #[error("bundle load failed: {0}")]
    Load(#[from] LoadError),

    /// The telemetry thread could not be started.
    #[error("failed to start telemetry thread: {source}")]
    Telemetry {
        /// OS error from the thread builder.
        #[source]
        source: std::io::Error,
    },

    /// The context was already destroyed.
    #[error("host context destroyed")]
    Destroyed,
}

impl BridgeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            BridgeError::Queue(e) => e.as_label(),
            BridgeError::Load(e) => e.as_label(),
            BridgeError::Telemetry { .. } => "bridge_telemetry_spawn_failed",
            BridgeError::Destroyed => "bridge_destroyed",
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_prefix_selects_variant() {
        let e = LoadError::from_message(format!("{RECOVERABLE_MARKER} not found"));
        assert_eq!(e.as_label(), "load_recoverable");

        // Marker must be a prefix, not a substring.
        let e = LoadError::from_message(format!("oops {RECOVERABLE_MARKER}"));
        assert_eq!(e.as_label(), "load_fatal");
    }

    #[test]
    fn recovered_chain_walks_in_occurrence_order() {
        let failures: Vec<(Arc<str>, SharedError)> = vec![
            ("a".into(), Arc::new(std::io::Error::other("first"))),
            ("b".into(), Arc::new(std::io::Error::other("second"))),
        ];
        let err = LoadError::Exhausted {
            history: RecoveredFailure::chain(&failures),
        };

        let mut seen = Vec::new();
        let mut cur = err.source();
        while let Some(e) = cur {
            seen.push(e.to_string());
            cur = e.source();
        }
        assert_eq!(
            seen,
            vec![
                "loader 'a' failed: first".to_string(),
                "loader 'b' failed: second".to_string(),
            ]
        );
        assert_eq!(err.as_message(), "exhausted after 2 recovered failure(s)");
    }

    #[test]
    fn panic_payloads_render() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }
}
