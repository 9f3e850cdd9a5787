mod common;

use chrono::{Datelike, Duration};
use estate_deals::clock::Clock;
use estate_deals::workflows::payments::{
    PaymentKind, PaymentMethod, PaymentState, PaymentStatus, ScheduleOwner,
};
use estate_deals::workflows::PurchaseId;

use common::desk;

#[test]
fn installment_schedule_splits_remainder_into_twelve_equal_payments() {
    let (desk, clock) = desk();
    let purchase = PurchaseId::from("pur-installment");
    let payments = desk
        .payments()
        .create_schedule(
            &ScheduleOwner::Purchase(purchase.clone()),
            "prop-b",
            1_200_000,
            300_000,
            PaymentMethod::Installment,
        )
        .expect("schedule");

    assert_eq!(payments.len(), 13);
    let initial: Vec<_> = payments
        .iter()
        .filter(|payment| payment.kind == PaymentKind::InitialPayment)
        .collect();
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].amount, 300_000);
    assert_eq!(initial[0].due_date, clock.today() + Duration::days(7));

    let installments: Vec<_> = payments
        .iter()
        .filter(|payment| payment.kind == PaymentKind::Installment)
        .collect();
    assert_eq!(installments.len(), 12);
    assert!(installments.iter().all(|payment| payment.amount == 75_000));
    for (index, payment) in installments.iter().enumerate() {
        assert_eq!(payment.title, format!("Рассрочка {}/12", index + 1));
        assert_eq!(payment.due_date.day(), clock.today().day());
    }

    let total: u64 = payments.iter().map(|payment| payment.amount).sum();
    assert_eq!(total, 1_200_000);
    assert_eq!(desk.payments().get_by_purchase(&purchase).len(), 13);
}

#[test]
fn overdue_is_derived_and_never_written() {
    let (desk, clock) = desk();
    let purchase = PurchaseId::from("pur-cash");
    desk.payments()
        .create_schedule(
            &ScheduleOwner::Purchase(purchase.clone()),
            "prop-c",
            9_800_000,
            0,
            PaymentMethod::Cash,
        )
        .expect("schedule");

    clock.advance(Duration::days(31));
    let overdue = desk.payments().overdue();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].status, PaymentStatus::Pending);
    assert_eq!(overdue[0].state(clock.today()), PaymentState::Overdue);

    let raw = desk.store().snapshot();
    let serialized = serde_json::to_string(&raw).expect("snapshot json");
    assert!(!serialized.contains("overdue"));
}
