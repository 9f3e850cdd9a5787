mod domain;
mod registry;

pub use domain::{Booking, BookingStatus};
pub use registry::BookingRegistry;
