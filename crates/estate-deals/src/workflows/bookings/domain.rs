use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::store::{Collection, Record};
use crate::workflows::catalog::{ApartmentRef, PropertySnapshot};
use crate::workflows::BookingId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Active,
    Expired,
    Cancelled,
    Converted,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Активна",
            Self::Expired => "Истекла",
            Self::Cancelled => "Отменена",
            Self::Converted => "Оформлена покупка",
        }
    }

    /// Expired, cancelled and converted bookings never change status again.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    pub const fn next_step(self) -> &'static str {
        match self {
            Self::Active => "Оформите покупку до окончания срока брони",
            Self::Expired => "Срок брони истёк, забронируйте квартиру повторно",
            Self::Cancelled => "Бронирование отменено",
            Self::Converted => "Продолжите оформление покупки в личном кабинете",
        }
    }
}

/// Time-boxed reservation of one apartment. Property fields are a snapshot taken at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub property_id: String,
    pub apartment_id: String,
    pub title: String,
    pub address: String,
    pub price: u64,
    pub booking_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub booking_fee: u64,
    pub apartment: ApartmentRef,
    pub status: BookingStatus,
    pub next_step: String,
}

impl Booking {
    pub(crate) fn new(
        property: &PropertySnapshot,
        apartment: &ApartmentRef,
        now: DateTime<Utc>,
        term: Duration,
        booking_fee: u64,
    ) -> Self {
        let status = BookingStatus::Active;
        Self {
            id: BookingId::generate(),
            property_id: property.id.clone(),
            apartment_id: apartment.id.clone(),
            title: property.title.clone(),
            address: property.address.clone(),
            price: property.price,
            booking_date: now,
            expiry_date: now + term,
            booking_fee,
            apartment: apartment.clone(),
            status,
            next_step: status.next_step().to_string(),
        }
    }

    pub fn is_due_to_expire(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Active && self.expiry_date < now
    }

    pub(crate) fn extend(&mut self, now: DateTime<Utc>, term: Duration) -> Result<(), Violation> {
        self.ensure_active("extended")?;
        self.expiry_date = now + term;
        Ok(())
    }

    pub(crate) fn cancel(&mut self) -> Result<(), Violation> {
        self.ensure_active("cancelled")?;
        self.set_status(BookingStatus::Cancelled);
        Ok(())
    }

    pub(crate) fn convert(&mut self) -> Result<(), Violation> {
        self.ensure_active("converted")?;
        self.set_status(BookingStatus::Converted);
        Ok(())
    }

    /// Returns whether the booking moved to expired.
    pub(crate) fn expire_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_due_to_expire(now) {
            return false;
        }
        self.set_status(BookingStatus::Expired);
        true
    }

    fn ensure_active(&self, action: &'static str) -> Result<(), Violation> {
        if self.status.is_terminal() {
            return Err(Violation::BookingClosed {
                id: self.id.to_string(),
                status: self.status,
                action,
            });
        }
        Ok(())
    }

    fn set_status(&mut self, status: BookingStatus) {
        self.status = status;
        self.next_step = status.next_step().to_string();
    }
}

impl Record for Booking {
    const COLLECTION: Collection = Collection::Bookings;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }
}
