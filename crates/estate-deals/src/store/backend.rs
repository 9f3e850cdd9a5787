use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use super::collection::Collection;
use super::Snapshot;

/// Durable medium behind a [`super::RecordStore`].
///
/// `commit` receives the complete snapshot plus the collections the unit of work touched.
/// Backends that write collections independently must report a half-applied commit as
/// [`StorageError::Partial`] rather than as success. The bundled backends commit the whole
/// snapshot at once and never produce it.
pub trait StorageBackend: Send + Sync + Debug {
    /// Raw persisted document, or `None` when the medium holds nothing yet.
    fn load(&self) -> Result<Option<Value>, StorageError>;

    fn commit(&self, snapshot: &Snapshot, touched: &BTreeSet<Collection>)
        -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage medium unavailable: {0}")]
    Unavailable(String),
    #[error("storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("commit persisted {committed:?} but failed on {failed:?}: {reason}")]
    Partial {
        committed: Vec<Collection>,
        failed: Collection,
        reason: String,
    },
    #[error("snapshot schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}

impl StorageError {
    /// Failures of the medium itself. These degrade the store instead of propagating.
    pub fn is_medium_failure(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Io(_))
    }
}

/// Keeps the committed snapshot in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    committed: Mutex<Option<Snapshot>>,
}

impl MemoryBackend {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            committed: Mutex::new(Some(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Value>, StorageError> {
        match self.snapshot() {
            Some(snapshot) => Ok(Some(serde_json::to_value(snapshot)?)),
            None => Ok(None),
        }
    }

    fn commit(
        &self,
        snapshot: &Snapshot,
        _touched: &BTreeSet<Collection>,
    ) -> Result<(), StorageError> {
        *self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

/// Stands in for a disabled medium: every load and commit fails as unavailable.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl StorageBackend for UnavailableBackend {
    fn load(&self) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }

    fn commit(
        &self,
        _snapshot: &Snapshot,
        _touched: &BTreeSet<Collection>,
    ) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}

/// Single JSON document on disk. Commits go to a sibling temp file that is renamed over the
/// target, so all collections of a unit of work land together or not at all.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "records.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<Value>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn commit(
        &self,
        snapshot: &Snapshot,
        _touched: &BTreeSet<Collection>,
    ) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
