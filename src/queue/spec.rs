//! # Queue specifications.
//!
//! [`QueueThreadSpec`] describes one queue (which kind of worker, its name,
//! stack size and shutdown mode). Specs are compared by value: two roles that
//! carry equal specs share one queue in [`QueueConfiguration`](crate::QueueConfiguration).
//!
//! [`QueueConfigurationSpec`] lists the specs for the scripting and native
//! modules roles. The UI role is always the host's main looper.

use std::borrow::Cow;

/// Which worker backs a queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueThreadKind {
    /// The host's main looper. Never spawned nor quit by this crate.
    Main,
    /// A dedicated background thread owned by the queue.
    NewBackground,
}

/// What happens to not-yet-dequeued work when a queue quits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShutdownMode {
    /// Everything submitted before `quit` still runs (default).
    #[default]
    Drain,
    /// Work not yet dequeued is dropped.
    Discard,
}

/// Specification of a single queue.
///
/// ## Example
/// ```rust
/// use bridgevisor::{QueueThreadSpec, QueueThreadKind, ShutdownMode};
///
/// let js = QueueThreadSpec::new_background("js")
///     .with_stack_size(2 * 1024 * 1024)
///     .with_shutdown(ShutdownMode::Discard);
/// assert_eq!(js.kind(), QueueThreadKind::NewBackground);
/// assert_eq!(js.name(), "js");
///
/// assert_eq!(QueueThreadSpec::main().kind(), QueueThreadKind::Main);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueueThreadSpec {
    kind: QueueThreadKind,
    name: Cow<'static, str>,
    stack_size: usize,
    shutdown: ShutdownMode,
}

impl QueueThreadSpec {
    /// Name given to the main (UI) queue.
    pub const MAIN_NAME: &'static str = "main_ui";

    /// Spec of the host's main looper.
    pub fn main() -> Self {
        Self {
            kind: QueueThreadKind::Main,
            name: Cow::Borrowed(Self::MAIN_NAME),
            stack_size: 0,
            shutdown: ShutdownMode::Drain,
        }
    }

    /// Spec of a dedicated background queue.
    pub fn new_background(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind: QueueThreadKind::NewBackground,
            name: name.into(),
            stack_size: 0,
            shutdown: ShutdownMode::Drain,
        }
    }

    /// Returns a spec with the given worker stack size in bytes (`0` = platform default).
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Returns a spec with the given shutdown mode.
    pub fn with_shutdown(mut self, mode: ShutdownMode) -> Self {
        self.shutdown = mode;
        self
    }

    /// Worker kind.
    pub fn kind(&self) -> QueueThreadKind {
        self.kind
    }

    /// Queue (and thread) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested stack size as an `Option` (`None` = platform default).
    #[inline]
    pub fn stack_size(&self) -> Option<usize> {
        if self.stack_size == 0 {
            None
        } else {
            Some(self.stack_size)
        }
    }

    /// Shutdown mode used by `quit()`.
    pub fn shutdown(&self) -> ShutdownMode {
        self.shutdown
    }

    /// Returns `true` if this spec designates the host's main looper.
    #[inline]
    pub fn is_main(&self) -> bool {
        self.kind == QueueThreadKind::Main
    }
}

/// Specs for the two configurable roles.
///
/// Point `native_modules` at [`QueueThreadSpec::main`] to run native module
/// work on the UI queue; give both roles the same background spec to make them
/// share one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfigurationSpec {
    /// Queue that runs the script runtime.
    pub scripting: QueueThreadSpec,
    /// Queue that runs native module calls.
    pub native_modules: QueueThreadSpec,
}

impl QueueConfigurationSpec {
    /// Builds a spec from explicit role specs.
    pub fn new(scripting: QueueThreadSpec, native_modules: QueueThreadSpec) -> Self {
        Self {
            scripting,
            native_modules,
        }
    }

    /// Returns a spec with native modules on the UI queue.
    pub fn with_native_modules_on_main(mut self) -> Self {
        self.native_modules = QueueThreadSpec::main();
        self
    }
}

impl Default for QueueConfigurationSpec {
    /// Scripting on background `"js"`, native modules on background `"native_modules"`.
    fn default() -> Self {
        Self {
            scripting: QueueThreadSpec::new_background("js"),
            native_modules: QueueThreadSpec::new_background("native_modules"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_specs_hash_equal() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(QueueThreadSpec::new_background("js"));
        assert!(set.contains(&QueueThreadSpec::new_background(String::from("js"))));
        assert!(!set.contains(&QueueThreadSpec::new_background("js").with_stack_size(1 << 20)));
    }

    #[test]
    fn zero_stack_size_means_default() {
        assert_eq!(QueueThreadSpec::new_background("x").stack_size(), None);
        assert_eq!(
            QueueThreadSpec::new_background("x").with_stack_size(4096).stack_size(),
            Some(4096)
        );
    }

    #[test]
    fn native_modules_can_alias_main() {
        let spec = QueueConfigurationSpec::default().with_native_modules_on_main();
        assert!(spec.native_modules.is_main());
        assert!(!spec.scripting.is_main());
    }
}
