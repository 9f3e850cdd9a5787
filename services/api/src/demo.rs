use crate::infra::sample_catalog;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use clap::{Args, ValueEnum};
use estate_deals::clock::{Clock, ManualClock};
use estate_deals::config::EngineConfig;
use estate_deals::error::AppError;
use estate_deals::store::RecordStore;
use estate_deals::workflows::cabinet::CabinetSummary;
use estate_deals::workflows::catalog::{ApartmentRef, PropertyCatalog, PropertySnapshot};
use estate_deals::workflows::documents::{DocumentStatus, FileMeta, StatusUpdate};
use estate_deals::workflows::payments::PaymentMethod;
use estate_deals::workflows::purchase::{GateFlags, MortgageRequest, Purchase};
use estate_deals::DealDesk;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum DemoMethod {
    Cash,
    Mortgage,
    #[default]
    Installment,
}

impl From<DemoMethod> for PaymentMethod {
    fn from(value: DemoMethod) -> Self {
        match value {
            DemoMethod::Cash => PaymentMethod::Cash,
            DemoMethod::Mortgage => PaymentMethod::Mortgage,
            DemoMethod::Installment => PaymentMethod::Installment,
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// How the buyer finances the apartment
    #[arg(long, value_enum, default_value_t = DemoMethod::Installment)]
    pub(crate) method: DemoMethod,
    /// Override the listing price of the demo apartment
    #[arg(long)]
    pub(crate) price: Option<u64>,
    /// Date the booking is made (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: Option<NaiveDate>,
    /// Print the payment schedule as CSV at the end
    #[arg(long)]
    pub(crate) csv: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args.start.unwrap_or_else(|| Utc::now().date_naive());
    let opening = Utc.from_utc_datetime(&start.and_hms_opt(10, 0, 0).unwrap_or_default());
    let clock = Arc::new(ManualClock::new(opening));
    let desk = DealDesk::new(
        Arc::new(RecordStore::in_memory()),
        clock.clone(),
        EngineConfig::default(),
    );

    let mut catalog = sample_catalog();
    let mut property = demo_property(&catalog);
    if let Some(price) = args.price {
        property.price = price;
        catalog.insert(property.clone());
    }
    let method = PaymentMethod::from(args.method);

    println!("== Бронирование ==");
    let apartment = ApartmentRef {
        id: "apt-1405".to_string(),
        rooms: 2,
        building: "Корпус 1".to_string(),
    };
    let booking = desk.reserve(&catalog, &property.id, &apartment)?;
    println!(
        "{} | {} | {} ₽ | бронь до {}",
        booking.title,
        booking.status.label(),
        booking.price,
        booking.expiry_date.format("%Y-%m-%d %H:%M")
    );

    for fee in desk.payments().get_by_booking(&booking.id) {
        desk.payments().mark_as_paid(&fee.id, "card", "tx-booking")?;
        println!("  {} | {} ₽ | оплачен", fee.title, fee.amount);
    }

    clock.advance(Duration::days(2));
    println!("\n== Оформление покупки ({}) ==", method.label());
    let mut purchase = desk
        .purchases()
        .create_from_booking(&booking.id, method, None)?;
    print_purchase(&purchase);

    for document in desk.documents().outstanding(&purchase.id) {
        desk.documents().upload_document(
            &document.id,
            FileMeta {
                name: format!("{}.pdf", document.kind.label()),
                size: 512 * 1024,
            },
        )?;
        desk.documents().update_status(
            &document.id,
            DocumentStatus::Verified,
            StatusUpdate::default(),
        )?;
        println!("  документ: {}: {}", document.title, DocumentStatus::Verified.label());
    }

    if method == PaymentMethod::Mortgage {
        desk.purchases().submit_mortgage_application(
            &purchase.id,
            MortgageRequest {
                bank: "Демо-банк".to_string(),
                amount: purchase.price.saturating_sub(purchase.price * 3 / 10),
                term_years: 20,
            },
        )?;
        println!("  заявка на ипотеку отправлена");
    }

    let mut flags = GateFlags {
        acknowledged: true,
        preliminary_contract_signed: true,
        ..GateFlags::default()
    };
    let progress = desk.purchases().progress(&purchase.id, flags)?;
    purchase = progress.purchase;
    if let Some(blocked) = &progress.blocked {
        println!("  ожидание: {} ({})", blocked.stage.title(), blocked.reason);
    }

    println!("\n== Платежи ==");
    let mut payments = desk.payments().get_by_purchase(&purchase.id);
    payments.sort_by_key(|payment| payment.due_date);
    for payment in &payments {
        let paid_on = clock.now().date_naive().max(payment.due_date);
        clock.set(Utc.from_utc_datetime(&paid_on.and_hms_opt(12, 0, 0).unwrap_or_default()));
        desk.payments().mark_as_paid(
            &payment.id,
            "card",
            &format!("tx-{}", payment.sequence.unwrap_or(0)),
        )?;
        println!(
            "  {} | {} ₽ | оплачен {}",
            payment.title, payment.amount, paid_on
        );
    }

    flags.final_contract_signed = true;
    let progress = desk.purchases().progress(&purchase.id, flags)?;
    purchase = progress.purchase;
    println!("\n== Итог ==");
    print_purchase(&purchase);
    if let Some(completed) = purchase.completion_date {
        println!("Сделка завершена {}", completed.format("%Y-%m-%d"));
    }

    let summary = desk.cabinet()?;
    print_cabinet(&summary);

    if args.csv {
        if let Some(bytes) = desk.payment_schedule_csv(&purchase.id)? {
            println!("\n{}", String::from_utf8_lossy(&bytes));
        }
    }
    Ok(())
}

fn demo_property(catalog: &impl PropertyCatalog) -> PropertySnapshot {
    catalog
        .lookup("prop-riverside")
        .unwrap_or_else(|| PropertySnapshot {
            id: "prop-riverside".to_string(),
            title: "Демо-квартира".to_string(),
            address: "Москва".to_string(),
            price: 24_500_000,
            price_per_sqm: 350_000,
            area: 70.0,
            floor: 14,
            completion_date: None,
            developer: "Демо".to_string(),
            image: None,
        })
}

fn print_purchase(purchase: &Purchase) {
    println!(
        "Покупка {}: {} | шаг {}/{} | {}%",
        purchase.id,
        purchase.status.label(),
        purchase.current_step,
        purchase.total_steps,
        purchase.progress_percent()
    );
    for stage in &purchase.stages {
        println!("  {}. {}: {}", stage.id, stage.title, stage.status.label());
    }
    println!("Следующий шаг: {}", purchase.next_action);
}

fn print_cabinet(summary: &CabinetSummary) {
    println!(
        "Кабинет: активных броней {}, покупок {}, к оплате {} ₽, оплачено {} ₽",
        summary.active_bookings.len(),
        summary.purchases.len(),
        summary.outstanding_amount,
        summary.paid_amount
    );
}
