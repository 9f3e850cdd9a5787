#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use estate_deals::clock::ManualClock;
use estate_deals::config::EngineConfig;
use estate_deals::store::RecordStore;
use estate_deals::workflows::catalog::{ApartmentRef, PropertySnapshot, StaticCatalog};
use estate_deals::DealDesk;

pub fn opening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 10, 0, 0)
        .single()
        .expect("valid opening time")
}

pub fn property(id: &str, price: u64) -> PropertySnapshot {
    PropertySnapshot {
        id: id.to_string(),
        title: format!("Квартира в ЖК {id}"),
        address: "Москва, ул. Тверская, 1".to_string(),
        price,
        price_per_sqm: price / 70,
        area: 70.0,
        floor: 11,
        completion_date: Some("2026-06".to_string()),
        developer: "ГК Основа".to_string(),
        image: Some(format!("/images/{id}.jpg")),
    }
}

pub fn apartment(id: &str) -> ApartmentRef {
    ApartmentRef {
        id: id.to_string(),
        rooms: 2,
        building: "Корпус 3".to_string(),
    }
}

pub fn catalog() -> StaticCatalog {
    StaticCatalog::new([
        property("prop-a", 24_500_000),
        property("prop-b", 1_200_000),
        property("prop-c", 9_800_000),
        property("prop-d", 15_000_000),
        property("prop-e", 6_300_000),
    ])
}

pub fn desk_with(store: RecordStore) -> (DealDesk, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(opening()));
    let desk = DealDesk::new(Arc::new(store), clock.clone(), EngineConfig::default());
    (desk, clock)
}

pub fn desk() -> (DealDesk, Arc<ManualClock>) {
    desk_with(RecordStore::in_memory())
}
