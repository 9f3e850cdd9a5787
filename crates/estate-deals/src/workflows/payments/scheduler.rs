use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use super::domain::{
    build_schedule, Payment, PaymentKind, PaymentMethod, PaymentState, ScheduleOwner,
};
use crate::clock::Clock;
use crate::error::DealError;
use crate::store::{RecordStore, UnitOfWork};
use crate::workflows::bookings::Booking;
use crate::workflows::{BookingId, PaymentId, PurchaseId};

/// Generates payment schedules and records settlements.
#[derive(Debug, Clone)]
pub struct PaymentScheduler {
    store: Arc<RecordStore>,
    clock: Arc<dyn Clock>,
}

impl PaymentScheduler {
    pub fn new(store: Arc<RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persist the whole schedule for one financing method in a single commit.
    pub fn create_schedule(
        &self,
        owner: &ScheduleOwner,
        property_id: &str,
        total: u64,
        initial: u64,
        method: PaymentMethod,
    ) -> Result<Vec<Payment>, DealError> {
        let start = self.clock.today();
        let (payments, outcome) = self.store.transaction(|uow| {
            Self::schedule_in(uow, owner, property_id, total, initial, method, start)
        })?;
        info!(
            owner = ?owner,
            method = method.label(),
            payments = payments.len(),
            ?outcome,
            "payment schedule created"
        );
        Ok(payments)
    }

    /// Fee for holding the unit, due the day the booking lapses.
    pub fn schedule_booking_fee(&self, booking: &Booking) -> Result<Payment, DealError> {
        let (payment, _) = self
            .store
            .transaction(|uow| Self::booking_fee_in(uow, booking))?;
        info!(booking_id = %booking.id, payment_id = %payment.id, amount = payment.amount, "booking fee scheduled");
        Ok(payment)
    }

    pub(crate) fn booking_fee_in(
        uow: &mut UnitOfWork,
        booking: &Booking,
    ) -> Result<Payment, DealError> {
        let payment = Payment::scheduled(
            ScheduleOwner::Booking(booking.id.clone()),
            &booking.property_id,
            PaymentKind::BookingFee,
            PaymentKind::BookingFee.label(),
            booking.booking_fee,
            booking.expiry_date.date_naive(),
        );
        uow.add(&payment)?;
        Ok(payment)
    }

    /// Settle a payment. Paying twice overwrites the earlier details.
    pub fn mark_as_paid(
        &self,
        id: &PaymentId,
        via: &str,
        transaction_id: &str,
    ) -> Result<Option<Payment>, DealError> {
        let now = self.clock.now();
        let (payment, _) = self.store.transaction(|uow| {
            let Some(mut payment) = uow.find::<Payment>(id.as_str()) else {
                return Ok(None);
            };
            payment.mark_paid(via, transaction_id, now)?;
            uow.put(&payment)?;
            Ok::<_, DealError>(Some(payment))
        })?;
        if let Some(payment) = &payment {
            info!(payment_id = %payment.id, amount = payment.amount, via, "payment marked paid");
        }
        Ok(payment)
    }

    pub fn get_by_id(&self, id: &PaymentId) -> Option<Payment> {
        self.store.find(id.as_str())
    }

    pub fn get_by_purchase(&self, purchase_id: &PurchaseId) -> Vec<Payment> {
        self.filtered(|payment| payment.belongs_to_purchase(purchase_id))
    }

    pub fn get_by_booking(&self, booking_id: &BookingId) -> Vec<Payment> {
        self.filtered(|payment| payment.belongs_to_booking(booking_id))
    }

    /// Filter by the derived state, so `Overdue` is evaluated against today.
    pub fn get_by_status(&self, state: PaymentState) -> Vec<Payment> {
        let today = self.clock.today();
        self.filtered(|payment| payment.state(today) == state)
    }

    pub fn overdue(&self) -> Vec<Payment> {
        self.get_by_status(PaymentState::Overdue)
    }

    pub fn all(&self) -> Vec<Payment> {
        self.store.all()
    }

    fn filtered(&self, keep: impl Fn(&Payment) -> bool) -> Vec<Payment> {
        self.store
            .all::<Payment>()
            .into_iter()
            .filter(|payment| keep(payment))
            .collect()
    }

    pub(crate) fn schedule_in(
        uow: &mut UnitOfWork,
        owner: &ScheduleOwner,
        property_id: &str,
        total: u64,
        initial: u64,
        method: PaymentMethod,
        start: NaiveDate,
    ) -> Result<Vec<Payment>, DealError> {
        let payments = build_schedule(owner, property_id, total, initial, method, start)?;
        for payment in &payments {
            uow.add(payment)?;
        }
        Ok(payments)
    }

    /// Pending payments of the purchase. Cancelled ones never block.
    pub(crate) fn unpaid_in(uow: &UnitOfWork, purchase_id: &PurchaseId) -> Vec<Payment> {
        uow.all::<Payment>()
            .into_iter()
            .filter(|payment| payment.belongs_to_purchase(purchase_id) && payment.is_pending())
            .collect()
    }

    /// Cancel every pending payment of `owner`. Paid ones are left as they are.
    pub(crate) fn cancel_pending_in(
        uow: &mut UnitOfWork,
        owner: &ScheduleOwner,
    ) -> Result<usize, DealError> {
        let pending: Vec<Payment> = uow
            .all::<Payment>()
            .into_iter()
            .filter(|payment| &payment.owner == owner && payment.is_pending())
            .collect();
        let mut cancelled = 0;
        for mut payment in pending {
            if payment.cancel() {
                uow.put(&payment)?;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }
}
