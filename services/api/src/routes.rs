use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use estate_deals::store::StoreHealth;
use estate_deals::workflows::catalog::PropertyCatalog;
use estate_deals::workflows::router::deal_router;
use estate_deals::DealDesk;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_deal_routes(
    desk: Arc<DealDesk>,
    catalog: Arc<dyn PropertyCatalog>,
) -> axum::Router {
    deal_router(desk, catalog)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound. A degraded store is reported but does not fail readiness.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let persistence = match state.desk.persistence() {
        StoreHealth::Available => json!({ "status": "available" }),
        StoreHealth::Degraded { reason } => json!({ "status": "degraded", "reason": reason }),
    };
    let payload = if ready {
        json!({ "status": "ready", "persistence": persistence })
    } else {
        json!({ "status": "initializing", "persistence": persistence })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::sample_catalog;
    use estate_deals::clock::SystemClock;
    use estate_deals::config::EngineConfig;
    use estate_deals::store::{RecordStore, UnavailableBackend};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn state(store: RecordStore, ready: bool) -> AppState {
        let desk = Arc::new(DealDesk::new(
            Arc::new(store),
            Arc::new(SystemClock),
            EngineConfig::default(),
        ));
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            desk,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_flag_set() {
        let response = readiness_endpoint(Extension(state(RecordStore::in_memory(), false)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["status"], "initializing");
    }

    #[tokio::test]
    async fn readiness_surfaces_degraded_persistence() {
        let store = RecordStore::open(UnavailableBackend::new("disk full")).expect("store");
        let response = readiness_endpoint(Extension(state(store, true)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["persistence"]["status"], "degraded");
    }

    #[tokio::test]
    async fn health_route_is_mounted_next_to_deal_routes() {
        let app_state = state(RecordStore::in_memory(), true);
        let router = with_deal_routes(app_state.desk.clone(), Arc::new(sample_catalog()))
            .layer(Extension(app_state));

        let response = router
            .oneshot(
                axum::http::Request::get("/health")
                    .body(axum::body::Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
