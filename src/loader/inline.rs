use crate::error::LoadError;
use crate::loader::bundle::{Bundle, BundleLoader, ScriptRuntime};

/// Evaluates a bundle held in memory (embedded assets, tests).
#[derive(Debug, Clone)]
pub struct InlineBundleLoader {
    name: String,
    bundle: Bundle,
}

impl InlineBundleLoader {
    pub fn new(name: impl Into<String>, source_url: &str, source: &str) -> Self {
        Self {
            name: name.into(),
            bundle: Bundle::new(source_url, source),
        }
    }
}

impl BundleLoader for InlineBundleLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_script(&mut self, runtime: &dyn ScriptRuntime) -> Result<Bundle, LoadError> {
        runtime.evaluate(&self.bundle)?;
        Ok(self.bundle.clone())
    }
}
