use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Violation;
use crate::store::{Collection, Record};
use crate::workflows::{BookingId, PaymentId, PurchaseId};

/// Number of equal monthly payments in an installment plan.
pub const INSTALLMENT_COUNT: u32 = 12;

const INITIAL_DUE_DAYS: u64 = 7;
const LUMP_SUM_DUE_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Mortgage,
    Installment,
}

impl PaymentMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cash => "Полная оплата",
            Self::Mortgage => "Ипотека",
            Self::Installment => "Рассрочка",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    BookingFee,
    InitialPayment,
    Installment,
    Mortgage,
    FinalPayment,
}

impl PaymentKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BookingFee => "Бронирование",
            Self::InitialPayment => "Первоначальный взнос",
            Self::Installment => "Платёж по рассрочке",
            Self::Mortgage => "Ипотечный платёж",
            Self::FinalPayment => "Окончательный расчёт",
        }
    }
}

/// Status as written to the store. Overdue is never persisted; older records that carry it
/// read back as pending and the overdue view is derived again from the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[serde(alias = "overdue")]
    Pending,
    Paid,
    Cancelled,
}

/// Status as shown to callers, evaluated against a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl PaymentState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Ожидает оплаты",
            Self::Paid => "Оплачен",
            Self::Overdue => "Просрочен",
            Self::Cancelled => "Отменён",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleOwner {
    Purchase(PurchaseId),
    Booking(BookingId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub owner: ScheduleOwner,
    pub property_id: String,
    pub kind: PaymentKind,
    pub title: String,
    /// 1-based position inside an installment plan.
    #[serde(default)]
    pub sequence: Option<u32>,
    pub amount: u64,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    #[serde(default)]
    pub paid_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_via: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl Payment {
    pub(crate) fn scheduled(
        owner: ScheduleOwner,
        property_id: &str,
        kind: PaymentKind,
        title: impl Into<String>,
        amount: u64,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id: PaymentId::generate(),
            owner,
            property_id: property_id.to_string(),
            kind,
            title: title.into(),
            sequence: None,
            amount,
            due_date,
            status: PaymentStatus::Pending,
            paid_date: None,
            paid_via: None,
            transaction_id: None,
        }
    }

    pub fn state(&self, today: NaiveDate) -> PaymentState {
        match self.status {
            PaymentStatus::Paid => PaymentState::Paid,
            PaymentStatus::Cancelled => PaymentState::Cancelled,
            PaymentStatus::Pending if self.due_date < today => PaymentState::Overdue,
            PaymentStatus::Pending => PaymentState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    pub fn belongs_to_purchase(&self, purchase_id: &PurchaseId) -> bool {
        matches!(&self.owner, ScheduleOwner::Purchase(owner) if owner == purchase_id)
    }

    pub fn belongs_to_booking(&self, booking_id: &BookingId) -> bool {
        matches!(&self.owner, ScheduleOwner::Booking(owner) if owner == booking_id)
    }

    /// Overwrites any earlier payment details.
    pub(crate) fn mark_paid(
        &mut self,
        via: &str,
        transaction_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), Violation> {
        if self.status == PaymentStatus::Cancelled {
            return Err(Violation::PaymentCancelled {
                id: self.id.to_string(),
            });
        }
        self.status = PaymentStatus::Paid;
        self.paid_date = Some(now);
        self.paid_via = Some(via.to_string());
        self.transaction_id = Some(transaction_id.to_string());
        Ok(())
    }

    pub(crate) fn cancel(&mut self) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = PaymentStatus::Cancelled;
        true
    }
}

impl Record for Payment {
    const COLLECTION: Collection = Collection::Payments;

    fn record_id(&self) -> &str {
        self.id.as_str()
    }
}

/// Lay out the obligations for one financing method, counted from `start`.
///
/// Cash is one lump sum of `total`. Installment is `initial` plus twelve monthly payments of
/// the remainder; integer-division leftovers land on the last one. Mortgage schedules only
/// `initial`; the financed part belongs to the bank.
pub fn build_schedule(
    owner: &ScheduleOwner,
    property_id: &str,
    total: u64,
    initial: u64,
    method: PaymentMethod,
    start: NaiveDate,
) -> Result<Vec<Payment>, Violation> {
    let initial_due = start + Days::new(INITIAL_DUE_DAYS);

    match method {
        PaymentMethod::Cash => Ok(vec![Payment::scheduled(
            owner.clone(),
            property_id,
            PaymentKind::InitialPayment,
            PaymentMethod::Cash.label(),
            total,
            start + Days::new(LUMP_SUM_DUE_DAYS),
        )]),
        PaymentMethod::Mortgage => {
            ensure_within(initial, total)?;
            Ok(vec![Payment::scheduled(
                owner.clone(),
                property_id,
                PaymentKind::InitialPayment,
                PaymentKind::InitialPayment.label(),
                initial,
                initial_due,
            )])
        }
        PaymentMethod::Installment => {
            ensure_within(initial, total)?;
            let financed = total - initial;
            let count = u64::from(INSTALLMENT_COUNT);
            let share = financed / count;
            let remainder = financed % count;

            let mut payments = Vec::with_capacity(INSTALLMENT_COUNT as usize + 1);
            payments.push(Payment::scheduled(
                owner.clone(),
                property_id,
                PaymentKind::InitialPayment,
                PaymentKind::InitialPayment.label(),
                initial,
                initial_due,
            ));
            for index in 1..=INSTALLMENT_COUNT {
                let amount = if index == INSTALLMENT_COUNT {
                    share + remainder
                } else {
                    share
                };
                let due = start
                    .checked_add_months(Months::new(index))
                    .unwrap_or(NaiveDate::MAX);
                let mut payment = Payment::scheduled(
                    owner.clone(),
                    property_id,
                    PaymentKind::Installment,
                    format!("Рассрочка {index}/{INSTALLMENT_COUNT}"),
                    amount,
                    due,
                );
                payment.sequence = Some(index);
                payments.push(payment);
            }
            Ok(payments)
        }
    }
}

fn ensure_within(initial: u64, total: u64) -> Result<(), Violation> {
    if initial > total {
        return Err(Violation::InitialExceedsTotal { initial, total });
    }
    Ok(())
}
