//! Keyed record persistence shared by every workflow component.
//!
//! Records live as JSON values grouped by [`Collection`]. All access goes through one mutex,
//! and every mutation runs inside a [`UnitOfWork`] that is committed to the backend as a
//! whole, so multi-record operations cannot interleave or half-apply.
//!
//! When the medium is unavailable the store degrades instead of failing: reads return what
//! is cached (empty if nothing could be loaded) and writes report [`WriteOutcome::Dropped`].
//! Check [`RecordStore::health`] to tell "nothing persisted" apart from "legitimately empty".

mod backend;
mod collection;
pub mod migration;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

pub use backend::{
    JsonFileBackend, MemoryBackend, StorageBackend, StorageError, UnavailableBackend,
};
pub use collection::Collection;
pub use migration::CURRENT_SCHEMA_VERSION;

/// A value stored in one of the named collections.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn record_id(&self) -> &str;
}

/// Versioned, whole-store document handed to backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    #[serde(default)]
    pub collections: BTreeMap<Collection, Vec<Value>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            collections: BTreeMap::new(),
        }
    }

    pub fn records(&self, collection: Collection) -> &[Value] {
        self.collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn records_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        self.collections.entry(collection).or_default()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Changes were committed to the medium.
    Applied,
    /// Nothing to do: duplicate insert, missing id, or an empty unit of work.
    Unchanged,
    /// The medium is unavailable; the change was discarded.
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreHealth {
    Available,
    Degraded { reason: String },
}

impl StoreHealth {
    pub fn is_available(&self) -> bool {
        matches!(self, StoreHealth::Available)
    }
}

#[derive(Debug)]
struct StoreState {
    snapshot: Snapshot,
    health: StoreHealth,
}

#[derive(Debug)]
pub struct RecordStore {
    backend: Box<dyn StorageBackend>,
    state: Mutex<StoreState>,
}

impl RecordStore {
    /// Load the backend's document, migrating older schema versions.
    ///
    /// An unavailable medium yields an empty, degraded store rather than an error.
    pub fn open(backend: impl StorageBackend + 'static) -> Result<Self, StorageError> {
        let backend: Box<dyn StorageBackend> = Box::new(backend);
        let state = Self::load_state(backend.as_ref())?;
        Ok(Self {
            backend,
            state: Mutex::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::default()),
            state: Mutex::new(StoreState {
                snapshot: Snapshot::empty(),
                health: StoreHealth::Available,
            }),
        }
    }

    fn load_state(backend: &dyn StorageBackend) -> Result<StoreState, StorageError> {
        match backend.load() {
            Ok(Some(raw)) => {
                let (snapshot, migrated) = migration::upgrade(raw)?;
                if migrated {
                    info!(
                        schema_version = snapshot.schema_version,
                        "migrated legacy record snapshot"
                    );
                }
                Ok(StoreState {
                    snapshot,
                    health: StoreHealth::Available,
                })
            }
            Ok(None) => Ok(StoreState {
                snapshot: Snapshot::empty(),
                health: StoreHealth::Available,
            }),
            Err(err) if err.is_medium_failure() => {
                warn!(error = %err, "record store medium unavailable; continuing without persistence");
                Ok(StoreState {
                    snapshot: Snapshot::empty(),
                    health: StoreHealth::Degraded {
                        reason: err.to_string(),
                    },
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Re-read the medium, clearing a degraded state if it has recovered.
    pub fn reload(&self) -> Result<StoreHealth, StorageError> {
        let fresh = Self::load_state(self.backend.as_ref())?;
        let mut state = self.lock();
        *state = fresh;
        Ok(state.health.clone())
    }

    pub fn health(&self) -> StoreHealth {
        self.lock().health.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    pub fn all<T: Record>(&self) -> Vec<T> {
        decode_all(&self.lock().snapshot)
    }

    pub fn find<T: Record>(&self, id: &str) -> Option<T> {
        decode_one(&self.lock().snapshot, id)
    }

    pub fn add<T: Record>(&self, record: &T) -> Result<WriteOutcome, StorageError> {
        self.transaction(|uow| uow.add(record)).map(settle)
    }

    /// Apply `change` to the record with `id`. Missing ids are a no-op.
    pub fn update<T, F>(&self, id: &str, change: F) -> Result<WriteOutcome, StorageError>
    where
        T: Record,
        F: FnOnce(&mut T),
    {
        self.transaction(|uow| uow.update::<T, _>(id, change).map(|found| found.is_some()))
            .map(|(found, outcome)| if found { outcome } else { WriteOutcome::Unchanged })
    }

    /// Shallow-merge the fields of a JSON object into the record with `id`.
    pub fn merge<T: Record>(&self, id: &str, patch: &Value) -> Result<WriteOutcome, StorageError> {
        self.transaction(|uow| uow.merge::<T>(id, patch)).map(settle)
    }

    pub fn remove<T: Record>(&self, id: &str) -> Result<WriteOutcome, StorageError> {
        self.transaction(|uow| Ok::<_, StorageError>(uow.remove::<T>(id)))
            .map(settle)
    }

    pub fn replace_all<T: Record>(&self, records: &[T]) -> Result<WriteOutcome, StorageError> {
        self.transaction(|uow| uow.replace_all(records)).map(|((), outcome)| outcome)
    }

    /// Run `work` against a private copy of the store and commit the result atomically.
    ///
    /// The store stays locked for the duration of `work`. An `Err` from `work` discards every
    /// staged change. On a degraded store the closure still runs but its changes are dropped.
    pub fn transaction<R, E, F>(&self, work: F) -> Result<(R, WriteOutcome), E>
    where
        F: FnOnce(&mut UnitOfWork) -> Result<R, E>,
        E: From<StorageError>,
    {
        let mut state = self.lock();
        let mut uow = UnitOfWork {
            snapshot: state.snapshot.clone(),
            touched: BTreeSet::new(),
        };

        let value = work(&mut uow)?;

        if uow.touched.is_empty() {
            return Ok((value, WriteOutcome::Unchanged));
        }

        if let StoreHealth::Degraded { reason } = &state.health {
            debug!(%reason, touched = ?uow.touched, "dropping write on degraded store");
            return Ok((value, WriteOutcome::Dropped));
        }

        match self.backend.commit(&uow.snapshot, &uow.touched) {
            Ok(()) => {
                state.snapshot = uow.snapshot;
                Ok((value, WriteOutcome::Applied))
            }
            Err(err) if err.is_medium_failure() => {
                warn!(error = %err, touched = ?uow.touched, "record store degraded; write dropped");
                state.health = StoreHealth::Degraded {
                    reason: err.to_string(),
                };
                Ok((value, WriteOutcome::Dropped))
            }
            Err(err) => Err(E::from(err)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn settle(result: (WriteOutcome, WriteOutcome)) -> WriteOutcome {
    match result {
        (WriteOutcome::Unchanged, _) => WriteOutcome::Unchanged,
        (_, committed) => committed,
    }
}

/// Staged changes of one [`RecordStore::transaction`].
#[derive(Debug)]
pub struct UnitOfWork {
    snapshot: Snapshot,
    touched: BTreeSet<Collection>,
}

impl UnitOfWork {
    pub fn all<T: Record>(&self) -> Vec<T> {
        decode_all(&self.snapshot)
    }

    pub fn find<T: Record>(&self, id: &str) -> Option<T> {
        decode_one(&self.snapshot, id)
    }

    /// Insert unless a record with the same id already exists.
    pub fn add<T: Record>(&mut self, record: &T) -> Result<WriteOutcome, StorageError> {
        if position(self.snapshot.records(T::COLLECTION), record.record_id()).is_some() {
            return Ok(WriteOutcome::Unchanged);
        }
        let value = serde_json::to_value(record)?;
        self.snapshot.records_mut(T::COLLECTION).push(value);
        self.touched.insert(T::COLLECTION);
        Ok(WriteOutcome::Applied)
    }

    /// Replace the record with the same id, or append it.
    pub fn put<T: Record>(&mut self, record: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(record)?;
        let records = self.snapshot.records_mut(T::COLLECTION);
        match position(records, record.record_id()) {
            Some(index) => records[index] = value,
            None => records.push(value),
        }
        self.touched.insert(T::COLLECTION);
        Ok(())
    }

    pub fn update<T, F>(&mut self, id: &str, change: F) -> Result<Option<T>, StorageError>
    where
        T: Record,
        F: FnOnce(&mut T),
    {
        let Some(index) = position(self.snapshot.records(T::COLLECTION), id) else {
            return Ok(None);
        };
        let records = self.snapshot.records_mut(T::COLLECTION);
        let mut record: T = serde_json::from_value(records[index].clone())?;
        change(&mut record);
        records[index] = serde_json::to_value(&record)?;
        self.touched.insert(T::COLLECTION);
        Ok(Some(record))
    }

    pub fn merge<T: Record>(&mut self, id: &str, patch: &Value) -> Result<WriteOutcome, StorageError> {
        let Some(index) = position(self.snapshot.records(T::COLLECTION), id) else {
            return Ok(WriteOutcome::Unchanged);
        };
        let Some(fields) = patch.as_object() else {
            return Ok(WriteOutcome::Unchanged);
        };

        let mut merged = self.snapshot.records(T::COLLECTION)[index].clone();
        if let Some(target) = merged.as_object_mut() {
            for (key, value) in fields.iter().filter(|(key, _)| key.as_str() != "id") {
                target.insert(key.clone(), value.clone());
            }
        }
        // the merged value must still decode as the record type
        let _: T = serde_json::from_value(merged.clone())?;

        self.snapshot.records_mut(T::COLLECTION)[index] = merged;
        self.touched.insert(T::COLLECTION);
        Ok(WriteOutcome::Applied)
    }

    pub fn remove<T: Record>(&mut self, id: &str) -> WriteOutcome {
        let records = self.snapshot.records_mut(T::COLLECTION);
        match position(records, id) {
            Some(index) => {
                records.remove(index);
                self.touched.insert(T::COLLECTION);
                WriteOutcome::Applied
            }
            None => WriteOutcome::Unchanged,
        }
    }

    pub fn replace_all<T: Record>(&mut self, records: &[T]) -> Result<(), StorageError> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.snapshot.collections.insert(T::COLLECTION, values);
        self.touched.insert(T::COLLECTION);
        Ok(())
    }
}

fn position(records: &[Value], id: &str) -> Option<usize> {
    records
        .iter()
        .position(|value| value.get("id").and_then(Value::as_str) == Some(id))
}

fn decode_all<T: Record>(snapshot: &Snapshot) -> Vec<T> {
    snapshot
        .records(T::COLLECTION)
        .iter()
        .filter_map(|value| match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(collection = T::COLLECTION.key(), error = %err, "skipping unreadable record");
                None
            }
        })
        .collect()
}

fn decode_one<T: Record>(snapshot: &Snapshot, id: &str) -> Option<T> {
    let records = snapshot.records(T::COLLECTION);
    let value = records.get(position(records, id)?)?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(record) => Some(record),
        Err(err) => {
            warn!(collection = T::COLLECTION.key(), id, error = %err, "record exists but is unreadable");
            None
        }
    }
}
