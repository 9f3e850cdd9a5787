use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info};

use super::domain::{Booking, BookingStatus};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{DealError, Entity};
use crate::store::{RecordStore, UnitOfWork};
use crate::workflows::catalog::{ApartmentRef, PropertySnapshot};
use crate::workflows::payments::{PaymentScheduler, ScheduleOwner};
use crate::workflows::BookingId;

/// Creates, extends, cancels and expires unit reservations.
#[derive(Debug, Clone)]
pub struct BookingRegistry {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    term: Duration,
    booking_fee: u64,
}

impl BookingRegistry {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        Self {
            store,
            clock,
            // out-of-range terms are reported by `EngineConfig::validate`
            term: Duration::days(
                config
                    .booking_term_days
                    .clamp(1, EngineConfig::MAX_BOOKING_TERM_DAYS),
            ),
            booking_fee: config.booking_fee,
        }
    }

    pub fn create(
        &self,
        property: &PropertySnapshot,
        apartment: &ApartmentRef,
    ) -> Result<Booking, DealError> {
        let (booking, outcome) = self
            .store
            .transaction(|uow| self.create_in(uow, property, apartment))?;
        info!(
            booking_id = %booking.id,
            property_id = %booking.property_id,
            apartment_id = %booking.apartment_id,
            expires = %booking.expiry_date,
            ?outcome,
            "booking created"
        );
        Ok(booking)
    }

    pub(crate) fn create_in(
        &self,
        uow: &mut UnitOfWork,
        property: &PropertySnapshot,
        apartment: &ApartmentRef,
    ) -> Result<Booking, DealError> {
        let booking = Booking::new(
            property,
            apartment,
            self.clock.now(),
            self.term,
            self.booking_fee,
        );
        uow.add(&booking)?;
        Ok(booking)
    }

    /// Cancel an active booking together with its unpaid fee. `Ok(None)` when the id is unknown.
    pub fn cancel(&self, id: &BookingId) -> Result<Option<Booking>, DealError> {
        let ((booking, fees), _) = self.store.transaction(|uow| {
            let booking =
                Self::mutate(uow, id, |booking| booking.cancel().map_err(DealError::from))?;
            let fees = match &booking {
                Some(booking) => Self::release_fee(uow, booking)?,
                None => 0,
            };
            Ok::<_, DealError>((booking, fees))
        })?;
        if let Some(booking) = &booking {
            info!(booking_id = %booking.id, released_fees = fees, "booking cancelled");
        }
        Ok(booking)
    }

    /// Reset the expiry to one full term from now, regardless of the current expiry.
    pub fn extend(&self, id: &BookingId) -> Result<Option<Booking>, DealError> {
        let now = self.clock.now();
        let term = self.term;
        let (booking, _) = self.store.transaction(|uow| {
            Self::mutate(uow, id, |booking| {
                booking.extend(now, term).map_err(DealError::from)
            })
        })?;
        if let Some(booking) = &booking {
            info!(booking_id = %booking.id, expires = %booking.expiry_date, "booking extended");
        }
        Ok(booking)
    }

    /// Move every active booking past its expiry to expired, releasing unpaid fees.
    /// Returns the ids that changed.
    pub fn mark_expired(&self) -> Result<Vec<BookingId>, DealError> {
        let now = self.clock.now();
        let (expired, _) = self.store.transaction(|uow| {
            let mut expired = Vec::new();
            for mut booking in uow.all::<Booking>() {
                if booking.expire_if_due(now) {
                    uow.put(&booking)?;
                    Self::release_fee(uow, &booking)?;
                    expired.push(booking.id);
                }
            }
            Ok::<_, DealError>(expired)
        })?;
        if expired.is_empty() {
            debug!("expiry sweep found nothing to expire");
        } else {
            info!(count = expired.len(), "bookings expired");
        }
        Ok(expired)
    }

    pub fn get_by_id(&self, id: &BookingId) -> Option<Booking> {
        self.store.find(id.as_str())
    }

    pub fn get_by_status(&self, status: BookingStatus) -> Vec<Booking> {
        self.all()
            .into_iter()
            .filter(|booking| booking.status == status)
            .collect()
    }

    pub fn all(&self) -> Vec<Booking> {
        self.store.all()
    }

    /// Mark a booking converted inside the purchase engine's unit of work.
    pub(crate) fn convert_to_purchase(
        uow: &mut UnitOfWork,
        id: &BookingId,
    ) -> Result<Booking, DealError> {
        Self::mutate(uow, id, |booking| booking.convert().map_err(DealError::from))?
            .ok_or_else(|| DealError::not_found(Entity::Booking, id.as_str()))
    }

    /// A booking that lapses or is withdrawn no longer owes its fee.
    fn release_fee(uow: &mut UnitOfWork, booking: &Booking) -> Result<usize, DealError> {
        PaymentScheduler::cancel_pending_in(uow, &ScheduleOwner::Booking(booking.id.clone()))
    }

    fn mutate<F>(uow: &mut UnitOfWork, id: &BookingId, change: F) -> Result<Option<Booking>, DealError>
    where
        F: FnOnce(&mut Booking) -> Result<(), DealError>,
    {
        let Some(mut booking) = uow.find::<Booking>(id.as_str()) else {
            return Ok(None);
        };
        change(&mut booking)?;
        uow.put(&booking)?;
        Ok(Some(booking))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Violation;
    use crate::workflows::payments::PaymentStatus;
    use chrono::{TimeZone, Utc};

    fn registry() -> (BookingRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap(),
        ));
        let registry = BookingRegistry::new(
            Arc::new(RecordStore::in_memory()),
            clock.clone(),
            &EngineConfig::default(),
        );
        (registry, clock)
    }

    fn reserve(registry: &BookingRegistry) -> Booking {
        let property = PropertySnapshot {
            id: "prop-1".into(),
            title: "ЖК Северный".into(),
            address: "пр. Мира, 10".into(),
            price: 7_500_000,
            price_per_sqm: 180_000,
            area: 41.5,
            floor: 12,
            completion_date: Some("2025-12".into()),
            developer: "Самолёт".into(),
            image: None,
        };
        let apartment = ApartmentRef {
            id: "apt-12".into(),
            rooms: 1,
            building: "2".into(),
        };
        registry.create(&property, &apartment).expect("booking")
    }

    #[test]
    fn create_snapshots_property_and_sets_term() {
        let (registry, clock) = registry();
        let booking = reserve(&registry);
        assert_eq!(booking.status, BookingStatus::Active);
        assert_eq!(booking.booking_date, clock.now());
        assert_eq!(booking.expiry_date - booking.booking_date, Duration::days(7));
        assert_eq!(booking.booking_fee, 50_000);
        assert_eq!(booking.price, 7_500_000);
        assert_eq!(registry.get_by_id(&booking.id), Some(booking));
    }

    #[test]
    fn extend_measures_from_the_call() {
        let (registry, clock) = registry();
        let booking = reserve(&registry);
        clock.advance(Duration::days(3));
        let extended = registry
            .extend(&booking.id)
            .expect("extend")
            .expect("booking exists");
        assert_eq!(extended.expiry_date, clock.now() + Duration::days(7));

        let again = registry
            .extend(&booking.id)
            .expect("extend")
            .expect("booking exists");
        assert_eq!(again.expiry_date, extended.expiry_date);
    }

    #[test]
    fn terminal_bookings_reject_changes() {
        let (registry, _) = registry();
        let booking = reserve(&registry);
        registry.cancel(&booking.id).expect("cancel");

        let err = registry.extend(&booking.id).expect_err("cancelled booking");
        assert!(matches!(
            err,
            DealError::InvariantViolation(Violation::BookingClosed {
                status: BookingStatus::Cancelled,
                ..
            })
        ));
        assert_eq!(
            registry.get_by_id(&booking.id).map(|b| b.status),
            Some(BookingStatus::Cancelled)
        );
    }

    #[test]
    fn expiry_sweep_is_idempotent() {
        let (registry, clock) = registry();
        let booking = reserve(&registry);
        let fresh = {
            clock.advance(Duration::days(2));
            reserve(&registry)
        };
        clock.advance(Duration::days(6));

        assert_eq!(registry.mark_expired().expect("sweep"), vec![booking.id.clone()]);
        assert!(registry.mark_expired().expect("second sweep").is_empty());
        assert_eq!(registry.get_by_status(BookingStatus::Expired).len(), 1);
        assert_eq!(
            registry.get_by_status(BookingStatus::Active)[0].id,
            fresh.id
        );
    }

    #[test]
    fn missing_booking_is_a_no_op() {
        let (registry, _) = registry();
        assert!(registry
            .cancel(&BookingId::from("bk-missing"))
            .expect("no-op")
            .is_none());
    }

    #[test]
    fn withdrawn_and_lapsed_bookings_release_unpaid_fees() {
        let (registry, clock) = registry();
        let payments = PaymentScheduler::new(registry.store.clone(), clock.clone());
        let cancelled = reserve(&registry);
        let lapsed = reserve(&registry);
        let settled = reserve(&registry);
        for booking in [&cancelled, &lapsed, &settled] {
            payments.schedule_booking_fee(booking).expect("fee scheduled");
        }
        let settled_fee = payments.get_by_booking(&settled.id).remove(0);
        payments
            .mark_as_paid(&settled_fee.id, "card", "tx-fee")
            .expect("fee paid");

        registry.cancel(&cancelled.id).expect("cancel");
        clock.advance(Duration::days(10));
        registry.mark_expired().expect("sweep");

        let fee_status = |id: &BookingId| payments.get_by_booking(id)[0].status;
        assert_eq!(fee_status(&cancelled.id), PaymentStatus::Cancelled);
        assert_eq!(fee_status(&lapsed.id), PaymentStatus::Cancelled);
        assert_eq!(fee_status(&settled.id), PaymentStatus::Paid);
        assert!(payments.overdue().is_empty());
    }

    #[test]
    fn unvalidated_term_never_ends_before_the_booking() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));
        let registry = BookingRegistry::new(
            Arc::new(RecordStore::in_memory()),
            clock,
            &EngineConfig {
                booking_term_days: -7,
                ..EngineConfig::default()
            },
        );
        let booking = reserve(&registry);
        assert!(booking.expiry_date > booking.booking_date);
        assert_eq!(booking.expiry_date - booking.booking_date, Duration::days(1));
    }
}
