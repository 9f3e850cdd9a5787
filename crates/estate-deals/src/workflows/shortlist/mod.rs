//! Favorites and the bounded comparison list. Both hold property snapshots taken when the
//! entry was added and share the record store with the deal workflow.

mod domain;
mod registry;

pub use domain::{ComparisonItem, FavoriteItem, ShortlistEntry};
pub use registry::{Comparison, Favorites, ShortlistRegistry};
