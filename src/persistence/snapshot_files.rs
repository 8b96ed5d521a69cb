//! Latest-snapshot files for read-only exposure by the host process.
//!
//! Unlike the two logs, these files are replaced on every accepted change.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader sees either the previous or the new document, never a partial one.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;

use crate::domain::SnapshotKind;
use crate::error::PersistenceError;

/// `timings.json` / `matches.json` inside a data directory.
#[derive(Debug, Clone)]
pub struct SnapshotFiles {
    dir: PathBuf,
}

impl SnapshotFiles {
    /// Uses `dir` as the data directory. It is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding the latest snapshot of `kind`.
    #[must_use]
    pub fn path_for(&self, kind: SnapshotKind) -> PathBuf {
        self.dir.join(format!("{kind}.json"))
    }

    /// Data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Atomically replaces the latest snapshot of `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if encoding, writing the temporary
    /// file, or the rename fails.
    pub async fn store(&self, kind: SnapshotKind, document: &Value) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistenceError::io(&self.dir, e))?;
        let target = self.path_for(kind);
        let tmp = self.dir.join(format!("{kind}.json.tmp"));
        let bytes = serde_json::to_vec(document)?;
        fs::write(&tmp, bytes)
            .await
            .map_err(|e| PersistenceError::io(&tmp, e))?;
        fs::rename(&tmp, &target)
            .await
            .map_err(|e| PersistenceError::io(&target, e))
    }

    /// Reads the latest snapshot of `kind`, `None` if none was stored.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the file exists but cannot be read
    /// or is not valid JSON.
    pub async fn load(&self, kind: SnapshotKind) -> Result<Option<Value>, PersistenceError> {
        let path = self.path_for(kind);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::io(&path, e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn store_then_load() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let files = SnapshotFiles::new(dir.path().join("data"));
        assert!(
            files
                .store(SnapshotKind::Timings, &json!({"server_datetime": 1}))
                .await
                .is_ok()
        );
        assert!(
            files
                .store(SnapshotKind::Timings, &json!({"server_datetime": 2}))
                .await
                .is_ok()
        );

        let loaded = files.load(SnapshotKind::Timings).await.ok().flatten();
        assert_eq!(loaded, Some(json!({"server_datetime": 2})));
        assert!(!dir.path().join("data").join("timings.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_snapshot_loads_as_none() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let files = SnapshotFiles::new(dir.path());
        assert!(matches!(files.load(SnapshotKind::Matches).await, Ok(None)));
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir failed");
        };
        let files = SnapshotFiles::new(dir.path());
        assert!(
            tokio::fs::write(files.path_for(SnapshotKind::Matches), "{")
                .await
                .is_ok()
        );
        assert!(matches!(
            files.load(SnapshotKind::Matches).await,
            Err(PersistenceError::Encode(_))
        ));
    }
}
