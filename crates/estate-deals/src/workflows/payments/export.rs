use chrono::NaiveDate;
use serde::Serialize;

use super::domain::Payment;

#[derive(Debug, Serialize)]
struct ScheduleRow<'a> {
    sequence: Option<u32>,
    title: &'a str,
    kind: &'static str,
    amount: u64,
    due_date: NaiveDate,
    status: &'static str,
    paid_date: Option<NaiveDate>,
    transaction_id: Option<&'a str>,
}

/// Render a payment schedule as CSV, one row per payment, states evaluated against `today`.
pub fn schedule_csv(payments: &[Payment], today: NaiveDate) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for payment in payments {
        writer.serialize(ScheduleRow {
            sequence: payment.sequence,
            title: &payment.title,
            kind: payment.kind.label(),
            amount: payment.amount,
            due_date: payment.due_date,
            status: payment.state(today).label(),
            paid_date: payment.paid_date.map(|paid| paid.date_naive()),
            transaction_id: payment.transaction_id.as_deref(),
        })?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::payments::{build_schedule, PaymentMethod, ScheduleOwner};
    use crate::workflows::PurchaseId;

    #[test]
    fn exports_header_and_one_row_per_payment() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date");
        let payments = build_schedule(
            &ScheduleOwner::Purchase(PurchaseId::from("pur-1")),
            "prop-1",
            1_200_000,
            300_000,
            PaymentMethod::Installment,
            start,
        )
        .expect("schedule");

        let bytes = schedule_csv(&payments, start).expect("csv");
        let text = String::from_utf8(bytes).expect("utf-8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 14);
        assert_eq!(
            lines[0],
            "sequence,title,kind,amount,due_date,status,paid_date,transaction_id"
        );
        assert!(lines[1].contains("300000,2024-06-08,Ожидает оплаты"));
        assert!(lines[2].starts_with("1,Рассрочка 1/12,"));
        assert!(lines[2].contains("75000,2024-07-01"));
    }
}
