use std::fmt;

use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub(crate) fn generate() -> Self {
                Self(format!(concat!($prefix, "-{}"), Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

record_id!(
    /// Identifier of a unit reservation.
    BookingId,
    "bk"
);
record_id!(PurchaseId, "pur");
record_id!(DocumentId, "doc");
record_id!(PaymentId, "pay");
record_id!(
    /// Identifier of a favorite or comparison entry.
    ShortlistItemId,
    "sl"
);
record_id!(MortgageApplicationId, "mtg");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_prefix_and_are_unique() {
        let first = BookingId::generate();
        let second = BookingId::generate();
        assert!(first.as_str().starts_with("bk-"));
        assert_ne!(first, second);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::Value::String(first.0.clone())
        );
    }
}
