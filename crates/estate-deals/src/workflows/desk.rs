use std::sync::Arc;

use tracing::info;

use super::bookings::{Booking, BookingRegistry};
use super::cabinet::CabinetSummary;
use super::catalog::{ApartmentRef, PropertyCatalog};
use super::documents::DocumentGate;
use super::payments::{schedule_csv, PaymentScheduler};
use super::purchase::PurchaseEngine;
use super::shortlist::{Comparison, Favorites};
use super::PurchaseId;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{DealError, Entity};
use crate::store::{RecordStore, StoreHealth};

/// Every deal component wired to one record store and one clock.
#[derive(Debug, Clone)]
pub struct DealDesk {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
    bookings: BookingRegistry,
    documents: DocumentGate,
    payments: PaymentScheduler,
    purchases: PurchaseEngine,
    favorites: Favorites,
    comparison: Comparison,
}

impl DealDesk {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Self {
            bookings: BookingRegistry::new(store.clone(), clock.clone(), &config),
            documents: DocumentGate::new(store.clone(), clock.clone()),
            payments: PaymentScheduler::new(store.clone(), clock.clone()),
            favorites: Favorites::favorites(store.clone(), clock.clone()),
            comparison: Comparison::comparison(
                store.clone(),
                clock.clone(),
                config.comparison_limit,
            ),
            purchases: PurchaseEngine::new(store.clone(), clock.clone(), config),
            store,
            clock,
        }
    }

    /// Book an apartment of a catalogued property and schedule its booking fee in one commit.
    pub fn reserve(
        &self,
        catalog: &dyn PropertyCatalog,
        property_id: &str,
        apartment: &ApartmentRef,
    ) -> Result<Booking, DealError> {
        let property = catalog
            .lookup(property_id)
            .ok_or_else(|| DealError::not_found(Entity::Property, property_id))?;

        let ((booking, fee), outcome) = self.store.transaction(|uow| {
            let booking = self.bookings.create_in(uow, &property, apartment)?;
            let fee = PaymentScheduler::booking_fee_in(uow, &booking)?;
            Ok::<_, DealError>((booking, fee))
        })?;
        info!(
            booking_id = %booking.id,
            property_id,
            fee_payment_id = %fee.id,
            ?outcome,
            "apartment reserved"
        );
        Ok(booking)
    }

    /// Expire stale bookings, then summarise everything for the buyer.
    pub fn cabinet(&self) -> Result<CabinetSummary, DealError> {
        self.bookings.mark_expired()?;
        Ok(CabinetSummary::build(
            &self.bookings.all(),
            &self.purchases.all(),
            &self.payments.all(),
            self.clock.now(),
        ))
    }

    /// CSV of the purchase's payment schedule, `None` for an unknown purchase.
    pub fn payment_schedule_csv(&self, id: &PurchaseId) -> Result<Option<Vec<u8>>, csv::Error> {
        if self.purchases.get_by_id(id).is_none() {
            return Ok(None);
        }
        let mut payments = self.payments.get_by_purchase(id);
        payments.sort_by_key(|payment| payment.due_date);
        schedule_csv(&payments, self.clock.today()).map(Some)
    }

    /// Whether writes currently reach the storage medium.
    pub fn persistence(&self) -> StoreHealth {
        self.store.health()
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn bookings(&self) -> &BookingRegistry {
        &self.bookings
    }

    pub fn documents(&self) -> &DocumentGate {
        &self.documents
    }

    pub fn payments(&self) -> &PaymentScheduler {
        &self.payments
    }

    pub fn purchases(&self) -> &PurchaseEngine {
        &self.purchases
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn comparison(&self) -> &Comparison {
        &self.comparison
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::store::UnavailableBackend;
    use crate::store::WriteOutcome;
    use crate::workflows::catalog::{PropertySnapshot, StaticCatalog};
    use crate::workflows::payments::PaymentKind;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new([PropertySnapshot {
            id: "prop-sky".into(),
            title: "ЖК Небо".into(),
            address: "ул. Высокая, 3".into(),
            price: 12_000_000,
            price_per_sqm: 240_000,
            area: 50.0,
            floor: 20,
            completion_date: None,
            developer: "Донстрой".into(),
            image: Some("sky.jpg".into()),
        }])
    }

    fn apartment() -> ApartmentRef {
        ApartmentRef {
            id: "apt-2001".into(),
            rooms: 2,
            building: "1".into(),
        }
    }

    #[test]
    fn reserve_books_and_schedules_fee() {
        let desk = DealDesk::new(
            Arc::new(RecordStore::in_memory()),
            Arc::new(SystemClock),
            EngineConfig::default(),
        );
        let booking = desk
            .reserve(&catalog(), "prop-sky", &apartment())
            .expect("reserve");

        let fees = desk.payments().get_by_booking(&booking.id);
        assert_eq!(fees.len(), 1);
        assert_eq!(fees[0].kind, PaymentKind::BookingFee);
        assert_eq!(fees[0].amount, 50_000);
        assert_eq!(fees[0].due_date, booking.expiry_date.date_naive());
    }

    #[test]
    fn reserve_unknown_property_is_not_found() {
        let desk = DealDesk::new(
            Arc::new(RecordStore::in_memory()),
            Arc::new(SystemClock),
            EngineConfig::default(),
        );
        let err = desk
            .reserve(&catalog(), "prop-missing", &apartment())
            .expect_err("unknown property");
        assert!(matches!(
            err,
            DealError::NotFound {
                entity: Entity::Property,
                ..
            }
        ));
        assert!(desk.bookings().all().is_empty());
    }

    #[test]
    fn degraded_store_keeps_working_without_persisting() {
        let store = RecordStore::open(UnavailableBackend::new("storage disabled"))
            .expect("degraded store opens");
        let desk = DealDesk::new(Arc::new(store), Arc::new(SystemClock), EngineConfig::default());
        assert!(!desk.persistence().is_available());

        let booking = desk
            .reserve(&catalog(), "prop-sky", &apartment())
            .expect("reserve still answers");
        assert!(desk.bookings().get_by_id(&booking.id).is_none());
        assert_eq!(
            desk.favorites().remove(&crate::workflows::ShortlistItemId::from("sl-1"))
                .expect("no-op"),
            WriteOutcome::Unchanged
        );
        assert!(desk.cabinet().expect("cabinet").active_bookings.is_empty());
    }
}
