use serde::{Deserialize, Serialize};

/// Named record collections. The set is closed; there are no free-form keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Bookings,
    Purchases,
    Documents,
    Payments,
    Favorites,
    ComparisonItems,
    MortgageApplications,
}

impl Collection {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Bookings,
            Self::Purchases,
            Self::Documents,
            Self::Payments,
            Self::Favorites,
            Self::ComparisonItems,
            Self::MortgageApplications,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Bookings => "bookings",
            Self::Purchases => "purchases",
            Self::Documents => "documents",
            Self::Payments => "payments",
            Self::Favorites => "favorites",
            Self::ComparisonItems => "comparison_items",
            Self::MortgageApplications => "mortgage_applications",
        }
    }

    /// Key used by unversioned snapshots written before schema version 1.
    pub const fn legacy_key(self) -> &'static str {
        match self {
            Self::Bookings => "bookings",
            Self::Purchases => "purchases",
            Self::Documents => "documents",
            Self::Payments => "payments",
            Self::Favorites => "favorites",
            Self::ComparisonItems => "comparisonItems",
            Self::MortgageApplications => "mortgageApplications",
        }
    }
}
