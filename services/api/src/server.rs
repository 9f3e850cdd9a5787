use crate::cli::ServeArgs;
use crate::infra::{open_store, sample_catalog, AppState};
use crate::routes::with_deal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use estate_deals::clock::SystemClock;
use estate_deals::config::AppConfig;
use estate_deals::error::AppError;
use estate_deals::telemetry;
use estate_deals::DealDesk;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(open_store(&config.storage)?);
    if let estate_deals::store::StoreHealth::Degraded { reason } = store.health() {
        warn!(%reason, "record store degraded at startup; changes will not persist");
    }
    let desk = Arc::new(DealDesk::new(
        store,
        Arc::new(SystemClock),
        config.engine.clone(),
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        desk: desk.clone(),
    };

    let app = with_deal_routes(desk, Arc::new(sample_catalog()))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "estate deals service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
