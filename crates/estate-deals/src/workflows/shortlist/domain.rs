use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{Collection, Record};
use crate::workflows::catalog::PropertySnapshot;
use crate::workflows::ShortlistItemId;

/// A stored reference to a property in one of the shortlists.
pub trait ShortlistEntry: Record {
    fn create(property: &PropertySnapshot, now: DateTime<Utc>) -> Self;

    fn id(&self) -> &ShortlistItemId;

    fn property(&self) -> &PropertySnapshot;
}

macro_rules! shortlist_entry {
    ($(#[$meta:meta])* $name:ident, $collection:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub id: ShortlistItemId,
            pub property: PropertySnapshot,
            pub added_date: DateTime<Utc>,
        }

        impl Record for $name {
            const COLLECTION: Collection = $collection;

            fn record_id(&self) -> &str {
                self.id.as_str()
            }
        }

        impl ShortlistEntry for $name {
            fn create(property: &PropertySnapshot, now: DateTime<Utc>) -> Self {
                Self {
                    id: ShortlistItemId::generate(),
                    property: property.clone(),
                    added_date: now,
                }
            }

            fn id(&self) -> &ShortlistItemId {
                &self.id
            }

            fn property(&self) -> &PropertySnapshot {
                &self.property
            }
        }
    };
}

shortlist_entry!(FavoriteItem, Collection::Favorites);
shortlist_entry!(
    /// Side-by-side comparison entry. The list is capped.
    ComparisonItem,
    Collection::ComparisonItems
);
