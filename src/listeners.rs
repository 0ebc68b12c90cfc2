//! # Identity-keyed listener sets with snapshot fan-out.
//!
//! [`ListenerSet`] backs both the headless task listeners and the lifecycle
//! listeners. Listeners are `Arc`s and deduplicated by pointer identity.
//!
//! ## Rules
//! - **Registration order**: notification visits listeners in the order they were added.
//! - **Snapshot**: notification iterates a copy, so a listener may add or remove
//!   listeners (itself included) from inside a callback.
//! - **Isolation**: a panicking listener is caught; the rest are still notified.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::panic_message;

/// Ordered, duplicate-free set of shared listeners.
pub(crate) struct ListenerSet<L: ?Sized> {
    inner: Mutex<Vec<Arc<L>>>,
}

impl<L: ?Sized> ListenerSet<L> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Adds `listener`; returns `false` if the same `Arc` is already present.
    pub(crate) fn add(&self, listener: Arc<L>) -> bool {
        let mut list = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if list.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        list.push(listener);
        true
    }

    /// Removes `listener`; returns `false` if it was not present.
    pub(crate) fn remove(&self, listener: &Arc<L>) -> bool {
        let mut list = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = list.len();
        list.retain(|l| !Arc::ptr_eq(l, listener));
        list.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub(crate) fn clear(&self) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<L>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls `f` for every listener in a snapshot.
    ///
    /// Returns the panic messages of listeners that panicked, in order.
    pub(crate) fn notify(&self, mut f: impl FnMut(&L)) -> Vec<String> {
        self.snapshot()
            .iter()
            .filter_map(|listener| call_guarded(|| f(&**listener)).err())
            .collect()
    }
}

/// Runs one listener callback, returning the panic message if it panicked.
pub(crate) fn call_guarded(f: impl FnOnce()) -> Result<(), String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Ping: Send + Sync {
        fn ping(&self, log: &Mutex<Vec<&'static str>>);
    }

    struct Named(&'static str);

    impl Ping for Named {
        fn ping(&self, log: &Mutex<Vec<&'static str>>) {
            log.lock().unwrap().push(self.0);
        }
    }

    struct Panics;

    impl Ping for Panics {
        fn ping(&self, _log: &Mutex<Vec<&'static str>>) {
            panic!("listener failed");
        }
    }

    #[test]
    fn dedupes_by_identity_and_keeps_order() {
        let set: ListenerSet<dyn Ping> = ListenerSet::new();
        let a: Arc<dyn Ping> = Arc::new(Named("a"));
        let b: Arc<dyn Ping> = Arc::new(Named("b"));

        assert!(set.add(Arc::clone(&a)));
        assert!(set.add(Arc::clone(&b)));
        assert!(!set.add(Arc::clone(&a)));
        assert_eq!(set.len(), 2);

        let log = Mutex::new(Vec::new());
        assert!(set.notify(|l| l.ping(&log)).is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);

        assert!(set.remove(&a));
        assert!(!set.remove(&a));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn panicking_listener_does_not_stop_the_rest() {
        let set: ListenerSet<dyn Ping> = ListenerSet::new();
        set.add(Arc::new(Panics));
        set.add(Arc::new(Named("after")));

        let log = Mutex::new(Vec::new());
        let panics = set.notify(|l| l.ping(&log));
        assert_eq!(panics, vec!["listener failed".to_string()]);
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn removal_during_notification_uses_snapshot() {
        let set: Arc<ListenerSet<dyn Ping>> = Arc::new(ListenerSet::new());
        let first: Arc<dyn Ping> = Arc::new(Named("first"));
        let second: Arc<dyn Ping> = Arc::new(Named("second"));
        set.add(Arc::clone(&first));
        set.add(Arc::clone(&second));

        let log = Mutex::new(Vec::new());
        set.notify(|l| {
            l.ping(&log);
            set.remove(&second);
        });
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(set.len(), 1);
    }
}
