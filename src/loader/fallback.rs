//! # FallbackBundleLoader: try sources in order of preference.
//!
//! ```text
//! load_script(runtime)
//!   loop:
//!     stack empty ──────────────► Err(Exhausted { history: A → B → ... })
//!     top.load_script(runtime)
//!       ├─ Ok(bundle)      ──────► return (stay parked on this loader)
//!       ├─ Err(Recoverable) ─────► pop, record, warn, publish LoaderFellBack, retry
//!       └─ Err(other)      ──────► return unchanged (no pop)
//! ```
//!
//! The stack only shrinks: once a loader is popped it is never tried again,
//! and a later success does not promote an earlier loader back.

use std::error::Error as StdError;
use std::sync::Arc;

use crate::error::{LoadError, RecoveredFailure, SharedError};
use crate::events::{Bus, Event, EventKind};
use crate::loader::bundle::{Bundle, BundleLoader, ScriptRuntime};

/// Delegates to the most preferred loader still standing.
pub struct FallbackBundleLoader {
    /// Top of the stack is the last element.
    stack: Vec<Box<dyn BundleLoader>>,
    recovered: Vec<(Arc<str>, SharedError)>,
    bus: Option<Bus>,
}

impl FallbackBundleLoader {
    /// Creates the chain from loaders given most preferred first.
    ///
    /// ## Example
    /// ```rust
    /// use bridgevisor::{BundleLoader, FallbackBundleLoader, InlineBundleLoader};
    ///
    /// let chain = FallbackBundleLoader::new(vec![
    ///     Box::new(InlineBundleLoader::new("preferred", "inline://a", "1")) as Box<dyn BundleLoader>,
    ///     Box::new(InlineBundleLoader::new("backup", "inline://b", "2")),
    /// ]);
    /// assert_eq!(chain.current(), Some("preferred"));
    /// ```
    pub fn new(loaders: impl IntoIterator<Item = Box<dyn BundleLoader>>) -> Self {
        let mut stack: Vec<_> = loaders.into_iter().collect();
        stack.reverse();
        Self {
            stack,
            recovered: Vec::new(),
            bus: None,
        }
    }

    /// Publishes `LoaderFellBack` on `bus` for every recovered failure.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Name of the loader the next call delegates to.
    pub fn current(&self) -> Option<&str> {
        self.stack.last().map(|l| l.name())
    }

    /// Loaders not yet popped.
    pub fn remaining(&self) -> usize {
        self.stack.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.stack.is_empty()
    }

    /// Recovered failures in occurrence order.
    pub fn recovered_errors(
        &self,
    ) -> impl Iterator<Item = (&str, &(dyn StdError + Send + Sync + 'static))> + '_ {
        self.recovered.iter().map(|(name, e)| (&**name, e.as_ref()))
    }

    fn exhausted(&self) -> LoadError {
        LoadError::Exhausted {
            history: RecoveredFailure::chain(&self.recovered),
        }
    }
}

impl BundleLoader for FallbackBundleLoader {
    fn name(&self) -> &str {
        "fallback"
    }

    fn load_script(&mut self, runtime: &dyn ScriptRuntime) -> Result<Bundle, LoadError> {
        loop {
            let Some(top) = self.stack.last_mut() else {
                return Err(self.exhausted());
            };

            match top.load_script(runtime) {
                Ok(bundle) => return Ok(bundle),
                Err(LoadError::Recoverable { source }) => {
                    let loader: Arc<str> = Arc::from(top.name());
                    let error: SharedError = Arc::from(source);
                    self.stack.pop();

                    tracing::warn!(
                        loader = %loader,
                        error = %error,
                        remaining = self.stack.len(),
                        "falling back from recoverable bundle load error"
                    );
                    if let Some(bus) = &self.bus {
                        bus.publish(
                            Event::new(EventKind::LoaderFellBack)
                                .with_name(Arc::clone(&loader))
                                .with_reason(error.to_string()),
                        );
                    }
                    self.recovered.push((loader, error));
                }
                Err(other) => return Err(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{FileBundleLoader, InlineBundleLoader, LoaderFn};
    use crate::testing::RecordingRuntime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn failing(name: &'static str, calls: Arc<AtomicUsize>, recoverable: bool) -> Box<dyn BundleLoader> {
        LoaderFn::boxed(name, move |_rt: &dyn ScriptRuntime| {
            calls.fetch_add(1, Ordering::SeqCst);
            let msg = format!("{name} unavailable");
            Err(if recoverable {
                LoadError::recoverable(msg)
            } else {
                LoadError::fatal(msg)
            })
        })
    }

    fn chain_messages(err: &LoadError) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = err.source();
        while let Some(e) = cur {
            out.push(e.to_string());
            cur = e.source();
        }
        out
    }

    #[test]
    fn falls_back_then_parks_on_the_successful_loader() {
        let rt = RecordingRuntime::new();
        let a_calls = Arc::new(AtomicUsize::new(0));
        let bus = Bus::new(8);
        let mut events = bus.subscribe();

        let mut chain = FallbackBundleLoader::new(vec![
            failing("asset", Arc::clone(&a_calls), true),
            Box::new(InlineBundleLoader::new("inline", "inline://app", "app()")),
        ])
        .with_bus(bus);

        let bundle = chain.load_script(&rt).unwrap();
        assert_eq!(bundle.source_url(), "inline://app");
        assert_eq!(chain.current(), Some("inline"));

        chain.load_script(&rt).unwrap();
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rt.evaluated(), vec!["inline://app", "inline://app"]);

        let recovered: Vec<_> = chain.recovered_errors().map(|(n, e)| (n.to_string(), e.to_string())).collect();
        assert_eq!(recovered, vec![("asset".to_string(), "asset unavailable".to_string())]);

        let ev = events.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::LoaderFellBack);
        assert_eq!(ev.name.as_deref(), Some("asset"));
    }

    #[test]
    fn fatal_error_propagates_without_popping() {
        let rt = RecordingRuntime::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = FallbackBundleLoader::new(vec![
            failing("broken", Arc::clone(&calls), false),
            Box::new(InlineBundleLoader::new("inline", "inline://app", "app()")),
        ]);

        let err = chain.load_script(&rt).unwrap_err();
        assert_eq!(err.as_label(), "load_fatal");
        assert_eq!(err.to_string(), "fatal: broken unavailable");
        assert_eq!(chain.remaining(), 2);

        chain.load_script(&rt).unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(rt.evaluated().is_empty());
    }

    #[test]
    fn exhaustion_chains_every_recovered_failure_in_order() {
        let rt = RecordingRuntime::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = FallbackBundleLoader::new(vec![
            failing("a", Arc::clone(&calls), true),
            failing("b", Arc::clone(&calls), true),
            failing("c", Arc::clone(&calls), true),
        ]);

        let err = chain.load_script(&rt).unwrap_err();
        assert!(chain.is_exhausted());
        assert_eq!(err.to_string(), "no fallback options available");
        assert_eq!(
            chain_messages(&err),
            vec![
                "loader 'a' failed: a unavailable",
                "loader 'b' failed: b unavailable",
                "loader 'c' failed: c unavailable",
            ]
        );
        assert_eq!(err.as_message(), "exhausted after 3 recovered failure(s)");

        // Later calls keep reporting the same history without retrying anything.
        let again = chain.load_script(&rt).unwrap_err();
        assert_eq!(chain_messages(&again).len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhaustion_keeps_each_failures_own_causes() {
        let rt = RecordingRuntime::new();
        let dir = std::env::temp_dir().join(format!("bridgevisor-missing-{}", std::process::id()));
        let a = dir.join("a.bundle");
        let b = dir.join("b.bundle");
        let mut chain = FallbackBundleLoader::new(vec![
            Box::new(FileBundleLoader::new(a.clone()).with_name("a")) as Box<dyn BundleLoader>,
            Box::new(FileBundleLoader::new(b.clone()).with_name("b")),
        ]);

        let err = chain.load_script(&rt).unwrap_err();
        let messages = chain_messages(&err);
        let not_found = std::fs::read_to_string(&a).unwrap_err().to_string();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], format!("loader 'a' failed: cannot read bundle {}", a.display()));
        assert_eq!(messages[1], not_found);
        assert_eq!(messages[2], format!("loader 'b' failed: cannot read bundle {}", b.display()));
        assert_eq!(messages[3], not_found);
        assert_eq!(err.as_message(), "exhausted after 2 recovered failure(s)");

        // Every io cause is reachable, not just the last one.
        let mut io_links = 0;
        let mut cur = err.source();
        while let Some(e) = cur {
            if let Some(link) = e.downcast_ref::<RecoveredFailure>() {
                if link.is_cause() {
                    io_links += 1;
                }
            }
            cur = e.source();
        }
        assert_eq!(io_links, 2);

        let LoadError::Exhausted { history: Some(head) } = &err else {
            panic!("unexpected: {err:?}");
        };
        assert_eq!(head.loader(), "a");
        assert_eq!(head.next().map(RecoveredFailure::loader), Some("b"));
        assert!(head.next().and_then(RecoveredFailure::next).is_none());
    }

    #[test]
    fn empty_chain_is_exhausted_without_history() {
        let rt = RecordingRuntime::new();
        let mut chain = FallbackBundleLoader::new(Vec::new());
        match chain.load_script(&rt) {
            Err(LoadError::Exhausted { history }) => assert!(history.is_none()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn message_marker_drives_fallback() {
        let rt = RecordingRuntime::new();
        let mut chain = FallbackBundleLoader::new(vec![
            LoaderFn::boxed("engine", |_rt: &dyn ScriptRuntime| {
                Err(LoadError::from_message(format!(
                    "{}: bundle asset missing",
                    crate::RECOVERABLE_MARKER
                )))
            }),
            Box::new(InlineBundleLoader::new("inline", "inline://app", "app()")),
        ]);
        assert!(chain.load_script(&rt).is_ok());
        assert_eq!(chain.recovered_errors().count(), 1);
    }
}
