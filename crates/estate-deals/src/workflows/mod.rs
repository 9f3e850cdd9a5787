pub mod bookings;
pub mod cabinet;
pub mod catalog;
mod desk;
pub mod documents;
mod ids;
pub mod payments;
pub mod purchase;
pub mod router;
pub mod shortlist;

pub use desk::DealDesk;
pub use ids::{
    BookingId, DocumentId, MortgageApplicationId, PaymentId, PurchaseId, ShortlistItemId,
};
