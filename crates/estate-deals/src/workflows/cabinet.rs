use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::bookings::{Booking, BookingStatus};
use super::payments::{Payment, PaymentKind, PaymentState, ScheduleOwner};
use super::purchase::{Purchase, PurchaseStatus, StageKind};
use super::{BookingId, PaymentId, PurchaseId};

/// Bookings closer than this to expiry are flagged in the cabinet.
pub const EXPIRY_WARNING_HOURS: i64 = 48;
const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: BookingId,
    pub title: String,
    pub address: String,
    pub price: u64,
    pub expiry_date: DateTime<Utc>,
    pub status: BookingStatus,
    pub status_label: String,
    pub hours_left: i64,
    pub expiring_soon: bool,
    pub next_step: String,
}

impl BookingView {
    fn new(booking: &Booking, now: DateTime<Utc>) -> Self {
        let left = booking.expiry_date - now;
        Self {
            id: booking.id.clone(),
            title: booking.title.clone(),
            address: booking.address.clone(),
            price: booking.price,
            expiry_date: booking.expiry_date,
            status: booking.status,
            status_label: booking.status.label().to_string(),
            hours_left: left.num_hours().max(0),
            expiring_soon: left <= Duration::hours(EXPIRY_WARNING_HOURS),
            next_step: booking.next_step.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseView {
    pub id: PurchaseId,
    pub title: String,
    pub status: PurchaseStatus,
    pub status_label: String,
    pub current_step: u8,
    pub total_steps: u8,
    pub progress_percent: u8,
    pub current_stage: Option<StageKind>,
    pub current_stage_title: Option<String>,
    pub next_action: String,
    pub payment_method_label: String,
    pub manager_name: String,
    pub estimated_completion: NaiveDate,
}

impl From<&Purchase> for PurchaseView {
    fn from(purchase: &Purchase) -> Self {
        let current = purchase.current_stage().map(|stage| stage.kind);
        Self {
            id: purchase.id.clone(),
            title: purchase.title.clone(),
            status: purchase.status,
            status_label: purchase.status.label().to_string(),
            current_step: purchase.current_step,
            total_steps: purchase.total_steps,
            progress_percent: purchase.progress_percent(),
            current_stage: current,
            current_stage_title: current.map(|kind| kind.title().to_string()),
            next_action: purchase.next_action.clone(),
            payment_method_label: purchase.payment_method.label().to_string(),
            manager_name: purchase.manager_name.clone(),
            estimated_completion: purchase.estimated_completion,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub owner: ScheduleOwner,
    pub title: String,
    pub kind: PaymentKind,
    pub amount: u64,
    pub due_date: NaiveDate,
    pub state: PaymentState,
    pub state_label: String,
}

impl PaymentView {
    fn new(payment: &Payment, today: NaiveDate) -> Self {
        let state = payment.state(today);
        Self {
            id: payment.id.clone(),
            owner: payment.owner.clone(),
            title: payment.title.clone(),
            kind: payment.kind,
            amount: payment.amount,
            due_date: payment.due_date,
            state,
            state_label: state.label().to_string(),
        }
    }
}

/// Overview shown on the buyer's personal page.
#[derive(Debug, Clone, Serialize)]
pub struct CabinetSummary {
    pub generated_at: DateTime<Utc>,
    pub active_bookings: Vec<BookingView>,
    pub expiring_soon: usize,
    pub purchases: Vec<PurchaseView>,
    pub upcoming_payments: Vec<PaymentView>,
    pub overdue_payments: Vec<PaymentView>,
    pub outstanding_amount: u64,
    pub paid_amount: u64,
}

impl CabinetSummary {
    /// Statuses are evaluated at `now`; run the expiry sweep first for fresh booking states.
    pub fn build(
        bookings: &[Booking],
        purchases: &[Purchase],
        payments: &[Payment],
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();

        let mut active_bookings: Vec<BookingView> = bookings
            .iter()
            .filter(|booking| booking.status == BookingStatus::Active)
            .map(|booking| BookingView::new(booking, now))
            .collect();
        active_bookings.sort_by_key(|view| view.expiry_date);
        let expiring_soon = active_bookings
            .iter()
            .filter(|view| view.expiring_soon)
            .count();

        let purchases = purchases
            .iter()
            .filter(|purchase| purchase.status != PurchaseStatus::Cancelled)
            .map(PurchaseView::from)
            .collect();

        let mut upcoming_payments = Vec::new();
        let mut overdue_payments = Vec::new();
        let mut outstanding_amount = 0;
        let mut paid_amount = 0;
        for payment in payments {
            let view = PaymentView::new(payment, today);
            match view.state {
                PaymentState::Pending => {
                    outstanding_amount += view.amount;
                    upcoming_payments.push(view);
                }
                PaymentState::Overdue => {
                    outstanding_amount += view.amount;
                    overdue_payments.push(view);
                }
                PaymentState::Paid => paid_amount += view.amount,
                PaymentState::Cancelled => {}
            }
        }
        upcoming_payments.sort_by_key(|view| view.due_date);
        upcoming_payments.truncate(UPCOMING_LIMIT);
        overdue_payments.sort_by_key(|view| view.due_date);

        Self {
            generated_at: now,
            active_bookings,
            expiring_soon,
            purchases,
            upcoming_payments,
            overdue_payments,
            outstanding_amount,
            paid_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::catalog::{ApartmentRef, PropertySnapshot};
    use crate::workflows::payments::{build_schedule, PaymentMethod};
    use chrono::TimeZone;

    fn booking(now: DateTime<Utc>, term: Duration) -> Booking {
        let property = PropertySnapshot {
            id: "prop-1".into(),
            title: "ЖК Парковый".into(),
            address: "ул. Лесная, 1".into(),
            price: 6_000_000,
            price_per_sqm: 150_000,
            area: 40.0,
            floor: 4,
            completion_date: None,
            developer: "Эталон".into(),
            image: None,
        };
        let apartment = ApartmentRef {
            id: "apt-1".into(),
            rooms: 1,
            building: "1".into(),
        };
        Booking::new(&property, &apartment, now, term, 50_000)
    }

    #[test]
    fn summary_flags_expiring_bookings_and_splits_payments() {
        let now = Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap();
        let soon = booking(now - Duration::days(6), Duration::days(7));
        let later = booking(now, Duration::days(7));

        let payments = build_schedule(
            &ScheduleOwner::Purchase(PurchaseId::from("pur-1")),
            "prop-1",
            1_200_000,
            300_000,
            PaymentMethod::Installment,
            now.date_naive() - Duration::days(10),
        )
        .expect("schedule");

        let summary = CabinetSummary::build(&[later, soon], &[], &payments, now);
        assert_eq!(summary.active_bookings.len(), 2);
        assert_eq!(summary.expiring_soon, 1);
        assert!(summary.active_bookings[0].expiring_soon);
        assert_eq!(summary.active_bookings[0].hours_left, 24);

        assert_eq!(summary.overdue_payments.len(), 1);
        assert_eq!(summary.overdue_payments[0].amount, 300_000);
        assert_eq!(summary.upcoming_payments.len(), UPCOMING_LIMIT);
        assert_eq!(summary.outstanding_amount, 1_200_000);
        assert_eq!(summary.paid_amount, 0);
    }
}
