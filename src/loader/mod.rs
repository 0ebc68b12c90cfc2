//! Bundle loading: the loader contract, concrete sources and the fallback chain.
//!
//! ## Contents
//! - [`BundleLoader`], [`ScriptRuntime`], [`Bundle`] the contract between loaders and the engine
//! - [`FallbackBundleLoader`] tries loaders most preferred first, falling back on recoverable errors
//! - [`FileBundleLoader`], [`InlineBundleLoader`], [`LoaderFn`] concrete sources

mod bundle;
mod fallback;
mod file;
mod inline;
mod loader_fn;

pub use bundle::{Bundle, BundleLoader, ScriptRuntime};
pub use fallback::FallbackBundleLoader;
pub use file::{BundleReadError, FileBundleLoader};
pub use inline::InlineBundleLoader;
pub use loader_fn::LoaderFn;
