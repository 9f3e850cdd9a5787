use chrono::NaiveDate;
use estate_deals::config::StorageConfig;
use estate_deals::store::{JsonFileBackend, RecordStore, StorageError};
use estate_deals::workflows::catalog::{PropertySnapshot, StaticCatalog};
use estate_deals::DealDesk;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) desk: Arc<DealDesk>,
}

/// File-backed store when a path is configured, process memory otherwise.
pub(crate) fn open_store(config: &StorageConfig) -> Result<RecordStore, StorageError> {
    match &config.path {
        Some(path) => {
            info!(path = %path.display(), "opening json record store");
            RecordStore::open(JsonFileBackend::new(path))
        }
        None => {
            info!("no store path configured; records live in memory");
            Ok(RecordStore::in_memory())
        }
    }
}

/// Listings served until a real catalog service is wired in.
pub(crate) fn sample_catalog() -> StaticCatalog {
    StaticCatalog::new([
        PropertySnapshot {
            id: "prop-riverside".to_string(),
            title: "ЖК Riverside, 2-комнатная".to_string(),
            address: "Москва, Береговой пр., 5".to_string(),
            price: 24_500_000,
            price_per_sqm: 350_000,
            area: 70.0,
            floor: 14,
            completion_date: Some("IV кв. 2025".to_string()),
            developer: "Riverside Development".to_string(),
            image: Some("/images/riverside.jpg".to_string()),
        },
        PropertySnapshot {
            id: "prop-parkview".to_string(),
            title: "ЖК Парк Вью, студия".to_string(),
            address: "Санкт-Петербург, ул. Парковая, 12".to_string(),
            price: 8_900_000,
            price_per_sqm: 296_667,
            area: 30.0,
            floor: 6,
            completion_date: None,
            developer: "Северный дом".to_string(),
            image: None,
        },
    ])
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| format!("invalid date `{value}`: {err}"))
}
