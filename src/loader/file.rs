//! # Bundle loaded from the filesystem.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::LoadError;
use crate::loader::bundle::{Bundle, BundleLoader, ScriptRuntime};

/// Reading a bundle file failed.
#[derive(Debug, Error)]
#[error("cannot read bundle {}", .path.display())]
pub struct BundleReadError {
    path: PathBuf,
    #[source]
    source: io::Error,
}

impl BundleReadError {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// Reads a bundle file and evaluates it.
///
/// A missing file is recoverable; any other IO error is fatal.
#[derive(Debug, Clone)]
pub struct FileBundleLoader {
    name: String,
    path: PathBuf,
    source_url: Option<String>,
}

impl FileBundleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: "file".to_string(),
            path: path.into(),
            source_url: None,
        }
    }

    /// Overrides the loader name used in logs and fallback history.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reports `url` instead of the file path as the bundle's source URL.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BundleLoader for FileBundleLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_script(&mut self, runtime: &dyn ScriptRuntime) -> Result<Bundle, LoadError> {
        let source = std::fs::read_to_string(&self.path).map_err(|source| {
            let missing = source.kind() == io::ErrorKind::NotFound;
            let err = BundleReadError {
                path: self.path.clone(),
                source,
            };
            if missing {
                LoadError::recoverable(err)
            } else {
                LoadError::fatal(err)
            }
        })?;

        let url = match &self.source_url {
            Some(url) => url.clone(),
            None => self.path.display().to_string(),
        };
        let bundle = Bundle::new(url, source);
        runtime.evaluate(&bundle)?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRuntime;
    use std::error::Error as _;

    fn temp_path(file: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bridgevisor-{}-{file}", std::process::id()))
    }

    #[test]
    fn missing_file_is_recoverable() {
        let rt = RecordingRuntime::new();
        let mut loader = FileBundleLoader::new(temp_path("does-not-exist.bundle"));
        let err = loader.load_script(&rt).unwrap_err();
        assert!(err.is_recoverable());

        let read = err
            .source()
            .and_then(|e| e.downcast_ref::<BundleReadError>())
            .unwrap();
        assert_eq!(read.kind(), io::ErrorKind::NotFound);
        assert!(rt.evaluated().is_empty());
    }

    #[test]
    fn directory_is_fatal() {
        let rt = RecordingRuntime::new();
        let mut loader = FileBundleLoader::new(std::env::temp_dir());
        let err = loader.load_script(&rt).unwrap_err();
        assert_eq!(err.as_label(), "load_fatal");
    }

    #[test]
    fn reads_and_evaluates() {
        let path = temp_path("main.bundle");
        std::fs::write(&path, "main()").unwrap();

        let rt = RecordingRuntime::new();
        let mut loader = FileBundleLoader::new(&path).with_source_url("assets://main.bundle");
        let bundle = loader.load_script(&rt).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(bundle.source(), "main()");
        assert_eq!(rt.evaluated(), vec!["assets://main.bundle"]);
    }

    #[test]
    fn evaluation_errors_propagate_as_tagged() {
        let path = temp_path("bad.bundle");
        std::fs::write(&path, "syntax error").unwrap();

        let rt = RecordingRuntime::failing_with(|| LoadError::fatal("unexpected token"));
        let mut loader = FileBundleLoader::new(&path);
        let err = loader.load_script(&rt).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(err.to_string(), "fatal: unexpected token");
    }
}
