mod common;

use estate_deals::store::{JsonFileBackend, RecordStore, StoreHealth, CURRENT_SCHEMA_VERSION};
use estate_deals::workflows::bookings::{Booking, BookingStatus};
use estate_deals::workflows::payments::{Payment, PaymentMethod, PaymentStatus};
use estate_deals::workflows::purchase::Purchase;
use serde_json::json;

use common::{apartment, catalog, desk_with};

#[test]
fn purchase_survives_reopening_the_store_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("deals.json");

    let purchase_id = {
        let store = RecordStore::open(JsonFileBackend::new(&path)).expect("open store");
        let (desk, _) = desk_with(store);
        let booking = desk
            .reserve(&catalog(), "prop-a", &apartment("apt-1"))
            .expect("booking");
        desk.purchases()
            .create_from_booking(&booking.id, PaymentMethod::Mortgage, Some(5_000_000))
            .expect("purchase")
            .id
    };

    let reopened = RecordStore::open(JsonFileBackend::new(&path)).expect("reopen store");
    assert_eq!(reopened.health(), StoreHealth::Available);
    assert_eq!(reopened.snapshot().schema_version, CURRENT_SCHEMA_VERSION);

    let purchase: Purchase = reopened.find(purchase_id.as_str()).expect("purchase persisted");
    let booking: Booking = reopened
        .find(purchase.booking_id.as_str())
        .expect("booking persisted");
    assert_eq!(booking.status, BookingStatus::Converted);
    assert_eq!(reopened.all::<Payment>().len(), 2);
}

#[test]
fn legacy_client_document_is_migrated_on_open() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("legacy.json");
    let legacy = json!({
        "bookings": [{
            "id": "bk-legacy",
            "propertyId": "prop-a",
            "apartmentId": "apt-1",
            "title": "Старая бронь",
            "address": "Москва",
            "price": 9_000_000,
            "bookingDate": "2024-01-10T10:00:00Z",
            "expiryDate": "2024-01-17T10:00:00Z",
            "bookingFee": 50_000,
            "apartment": { "id": "apt-1", "rooms": 1, "building": "1" },
            "status": "active",
            "nextStep": "Оформите покупку"
        }],
        "payments": [{
            "id": "pay-legacy",
            "owner": { "booking": "bk-legacy" },
            "propertyId": "prop-a",
            "kind": "booking_fee",
            "title": "Бронирование",
            "amount": 50_000,
            "dueDate": "2024-01-17",
            "status": "overdue"
        }],
        "comparisonItems": []
    });
    std::fs::write(&path, serde_json::to_vec(&legacy).expect("json")).expect("write legacy");

    let store = RecordStore::open(JsonFileBackend::new(&path)).expect("open legacy store");
    let booking: Booking = store.find("bk-legacy").expect("legacy booking readable");
    assert_eq!(booking.price, 9_000_000);
    let payment: Payment = store.find("pay-legacy").expect("legacy payment readable");
    assert_eq!(payment.status, PaymentStatus::Pending);
}
