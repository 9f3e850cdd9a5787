use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, info};

use super::domain::{ComparisonItem, FavoriteItem, ShortlistEntry};
use crate::clock::Clock;
use crate::error::{DealError, Violation};
use crate::store::{RecordStore, WriteOutcome};
use crate::workflows::catalog::PropertySnapshot;
use crate::workflows::ShortlistItemId;

pub type Favorites = ShortlistRegistry<FavoriteItem>;
pub type Comparison = ShortlistRegistry<ComparisonItem>;

/// A set of properties, optionally bounded, keyed by generated entry ids.
#[derive(Debug)]
pub struct ShortlistRegistry<T> {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    limit: Option<usize>,
    entries: PhantomData<fn() -> T>,
}

impl<T> Clone for ShortlistRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            limit: self.limit,
            entries: PhantomData,
        }
    }
}

impl ShortlistRegistry<FavoriteItem> {
    pub fn favorites(store: Arc<RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_limit(store, clock, None)
    }
}

impl ShortlistRegistry<ComparisonItem> {
    pub fn comparison(store: Arc<RecordStore>, clock: Arc<dyn Clock>, limit: usize) -> Self {
        Self::with_limit(store, clock, Some(limit))
    }
}

impl<T: ShortlistEntry> ShortlistRegistry<T> {
    fn with_limit(store: Arc<RecordStore>, clock: Arc<dyn Clock>, limit: Option<usize>) -> Self {
        Self {
            store,
            clock,
            limit,
            entries: PhantomData,
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Add a property. Adding one that is already listed returns the existing entry.
    pub fn add(&self, property: &PropertySnapshot) -> Result<T, DealError> {
        let now = self.clock.now();
        let limit = self.limit;
        let (entry, outcome) = self.store.transaction(|uow| {
            let existing = uow.all::<T>();
            if let Some(found) = existing
                .iter()
                .find(|entry| entry.property().id == property.id)
            {
                return Ok(found.clone());
            }
            if let Some(limit) = limit {
                if existing.len() >= limit {
                    return Err(DealError::from(Violation::ComparisonFull { limit }));
                }
            }
            let entry = T::create(property, now);
            uow.add(&entry)?;
            Ok::<_, DealError>(entry)
        })?;
        info!(
            collection = T::COLLECTION.key(),
            property_id = %property.id,
            ?outcome,
            "shortlist entry added"
        );
        Ok(entry)
    }

    pub fn remove(&self, id: &ShortlistItemId) -> Result<WriteOutcome, DealError> {
        let outcome = self.store.remove::<T>(id.as_str())?;
        debug!(collection = T::COLLECTION.key(), entry_id = %id, ?outcome, "shortlist entry removed");
        Ok(outcome)
    }

    pub fn remove_property(&self, property_id: &str) -> Result<WriteOutcome, DealError> {
        match self
            .list()
            .into_iter()
            .find(|entry| entry.property().id == property_id)
        {
            Some(entry) => self.remove(entry.id()),
            None => Ok(WriteOutcome::Unchanged),
        }
    }

    pub fn clear(&self) -> Result<WriteOutcome, DealError> {
        let outcome = self.store.replace_all::<T>(&[])?;
        info!(collection = T::COLLECTION.key(), ?outcome, "shortlist cleared");
        Ok(outcome)
    }

    pub fn list(&self) -> Vec<T> {
        self.store.all()
    }

    pub fn contains(&self, property_id: &str) -> bool {
        self.list()
            .iter()
            .any(|entry| entry.property().id == property_id)
    }
}
