//! # Bundles, script runtimes and the loader contract.
//!
//! A [`BundleLoader`] produces a [`Bundle`] and hands it to a [`ScriptRuntime`]
//! for evaluation. Loaders run on the scripting queue.
//!
//! ## Error contract
//! - [`LoadError::Recoverable`]: this source is unavailable, another may work.
//! - [`LoadError::Fatal`]: anything else; never masked by a fallback.

use std::fmt;
use std::sync::Arc;

use crate::error::LoadError;
use crate::tasks::TaskId;

/// Script source plus the URL it was loaded from.
#[derive(Clone, PartialEq, Eq)]
pub struct Bundle {
    source_url: Arc<str>,
    source: Arc<str>,
}

impl Bundle {
    pub fn new(source_url: impl Into<Arc<str>>, source: impl Into<Arc<str>>) -> Self {
        Self {
            source_url: source_url.into(),
            source: source.into(),
        }
    }

    /// Where the source came from (file path, asset URL, dev server URL).
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bundle")
            .field("source_url", &self.source_url)
            .field("len", &self.source.len())
            .finish()
    }
}

/// The embedded script engine, as seen by the bridge.
///
/// `evaluate` is called on the scripting queue by loaders;
/// `start_headless_task` is dispatched to the scripting queue by
/// [`HeadlessTaskContext`](crate::HeadlessTaskContext).
pub trait ScriptRuntime: Send + Sync + 'static {
    /// Evaluates a bundle. Failures should be tagged recoverable only when
    /// another source could succeed.
    fn evaluate(&self, bundle: &Bundle) -> Result<(), LoadError>;

    /// Starts the script side of a headless task.
    fn start_headless_task(&self, id: TaskId, task_key: &str, data: Option<&str>);
}

/// A strategy that loads a bundle into a runtime.
///
/// ## Example
/// ```rust
/// use bridgevisor::{Bundle, BundleLoader, LoadError, ScriptRuntime};
///
/// struct DevServer { url: String }
///
/// impl BundleLoader for DevServer {
///     fn name(&self) -> &str { "dev-server" }
///
///     fn load_script(&mut self, runtime: &dyn ScriptRuntime) -> Result<Bundle, LoadError> {
///         // A real loader would fetch `self.url`; an unreachable server is recoverable.
///         Err(LoadError::recoverable(format!("{} unreachable", self.url)))
///     }
/// }
/// ```
pub trait BundleLoader: Send + 'static {
    /// Name used in logs and in the fallback history.
    fn name(&self) -> &str;

    /// Loads and evaluates the bundle.
    fn load_script(&mut self, runtime: &dyn ScriptRuntime) -> Result<Bundle, LoadError>;
}

impl<L: BundleLoader + ?Sized> BundleLoader for Box<L> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load_script(&mut self, runtime: &dyn ScriptRuntime) -> Result<Bundle, LoadError> {
        (**self).load_script(runtime)
    }
}
