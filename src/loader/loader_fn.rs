//! # Closure-backed loader (`LoaderFn`)
//!
//! [`LoaderFn`] wraps a closure `F: FnMut(&dyn ScriptRuntime) -> Result<Bundle, LoadError>`.
//! Handy for sources that need no state of their own (a dev server probe, a test double).
//!
//! ## Example
//! ```rust
//! use bridgevisor::{Bundle, BundleLoader, LoadError, LoaderFn, ScriptRuntime};
//!
//! let probe = LoaderFn::boxed("dev-server", |_rt: &dyn ScriptRuntime| {
//!     Err(LoadError::recoverable("dev server not running"))
//! });
//! assert_eq!(probe.name(), "dev-server");
//! ```

use std::borrow::Cow;
use std::fmt;

use crate::error::LoadError;
use crate::loader::bundle::{Bundle, BundleLoader, ScriptRuntime};

/// Function-backed loader implementation.
pub struct LoaderFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> LoaderFn<F> {
    /// Creates a new function-backed loader.
    ///
    /// Prefer [`LoaderFn::boxed`] when you immediately need a `Box<dyn BundleLoader>`.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> LoaderFn<F>
where
    F: FnMut(&dyn ScriptRuntime) -> Result<Bundle, LoadError> + Send + 'static,
{
    /// Creates the loader and returns it boxed, ready for a fallback chain.
    pub fn boxed(name: impl Into<Cow<'static, str>>, f: F) -> Box<dyn BundleLoader> {
        Box::new(Self::new(name, f))
    }
}

impl<F> fmt::Debug for LoaderFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderFn").field("name", &self.name).finish()
    }
}

impl<F> BundleLoader for LoaderFn<F>
where
    F: FnMut(&dyn ScriptRuntime) -> Result<Bundle, LoadError> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn load_script(&mut self, runtime: &dyn ScriptRuntime) -> Result<Bundle, LoadError> {
        (self.f)(runtime)
    }
}
