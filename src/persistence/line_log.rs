//! Append-only line-delimited JSON log.

use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::records::LineRecord;
use crate::error::PersistenceError;

/// Appends one JSON record per line to a single file.
///
/// The file is created empty on first use and only ever appended to.
#[derive(Debug, Clone)]
pub struct LineLog {
    path: PathBuf,
}

impl LineLog {
    /// Creates a log writing to `path`. Nothing is touched until the first
    /// append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record as a single write.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the record cannot be encoded or
    /// the file cannot be created or written.
    pub async fn append(&self, record: &LineRecord<'_>) -> Result<(), PersistenceError> {
        let line = record.to_line()?;
        ensure_parent(&self.path).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))
    }
}

/// Creates the parent directory of `path` if it has one.
pub(crate) async fn ensure_parent(path: &Path) -> Result<(), PersistenceError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .await
            .map_err(|e| PersistenceError::io(parent, e)),
        _ => Ok(()),
    }
}
