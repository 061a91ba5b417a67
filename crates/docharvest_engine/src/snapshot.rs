use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};

use crate::persist::{AtomicFileWriter, PersistError};

/// The rendered page kept on disk so later runs can skip rendering.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    path: PathBuf,
}

impl PageSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached HTML, if a readable non-empty snapshot exists.
    pub fn load(&self) -> Option<String> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => {
                engine_warn!("Ignoring empty snapshot {:?}", self.path);
                None
            }
            Ok(bytes) => {
                engine_info!("Reusing snapshot {:?} ({} bytes)", self.path, bytes.len());
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                engine_warn!("Failed to read snapshot {:?}: {}", self.path, err);
                None
            }
        }
    }

    pub fn store(&self, html: &str) -> Result<PathBuf, PersistError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistError::OutputDir(format!("invalid snapshot path {:?}", self.path)))?;
        AtomicFileWriter::new(dir).write(filename, html.as_bytes())
    }
}
