use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("refusing to persist empty content for {0}")]
    EmptyContent(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result of a no-clobber write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { path: PathBuf, bytes: u64 },
    AlreadyExists { path: PathBuf },
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Writability check; the temp file is removed on drop.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes files under one directory through a temp file and a rename, so a
/// destination path only ever holds complete content.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `content` to `{dir}/{filename}`, replacing any existing file.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let tmp = self.stage(content)?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Write `content` to `{dir}/{filename}` unless a file is already there.
    ///
    /// An existing file is left byte-for-byte untouched. On any error the
    /// destination path is not created.
    pub fn write_new(&self, filename: &str, content: &[u8]) -> Result<WriteOutcome, PersistError> {
        let target = self.dir.join(filename);
        if content.is_empty() {
            return Err(PersistError::EmptyContent(target.display().to_string()));
        }
        if target.is_file() {
            return Ok(WriteOutcome::AlreadyExists { path: target });
        }

        let tmp = self.stage(content)?;
        match tmp.persist_noclobber(&target) {
            Ok(_) => Ok(WriteOutcome::Written {
                path: target,
                bytes: content.len() as u64,
            }),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(WriteOutcome::AlreadyExists { path: target })
            }
            Err(err) => Err(PersistError::Io(err.error)),
        }
    }

    fn stage(&self, content: &[u8]) -> Result<NamedTempFile, PersistError> {
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        // Temp files are created 0600; finished artifacts are world-readable.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
        }
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        Ok(tmp)
    }
}
