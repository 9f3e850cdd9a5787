use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::deal_router;
use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::store::RecordStore;
use crate::workflows::catalog::{PropertySnapshot, StaticCatalog};
use crate::workflows::DealDesk;

fn catalog() -> StaticCatalog {
    StaticCatalog::new((1..=5).map(|index| PropertySnapshot {
        id: format!("prop-{index}"),
        title: format!("ЖК Квартал {index}"),
        address: format!("ул. Садовая, {index}"),
        price: 5_000_000 + index * 1_000_000,
        price_per_sqm: 150_000,
        area: 45.0,
        floor: 5,
        completion_date: None,
        developer: "ЛСР".into(),
        image: None,
    }))
}

fn app() -> (Router, Arc<DealDesk>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap(),
    ));
    let desk = Arc::new(DealDesk::new(
        Arc::new(RecordStore::in_memory()),
        clock,
        EngineConfig::default(),
    ));
    (deal_router(desk.clone(), Arc::new(catalog())), desk)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

async fn reserve(router: &Router, property_id: &str) -> Value {
    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/bookings",
            json!({
                "property_id": property_id,
                "apartment": { "id": "apt-7", "rooms": 2, "building": "B" }
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await
}

#[tokio::test]
async fn reserve_route_creates_active_booking() {
    let (router, _) = app();
    let booking = reserve(&router, "prop-2").await;
    assert_eq!(booking["status"], "active");
    assert_eq!(booking["price"], 7_000_000);

    let response = router
        .oneshot(get("/api/v1/bookings?status=active"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let listed = read_json(response).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn unknown_property_maps_to_not_found() {
    let (router, _) = app();
    let response = router
        .oneshot(post_json(
            "/api/v1/bookings",
            json!({
                "property_id": "prop-404",
                "apartment": { "id": "apt-1", "rooms": 1, "building": "A" }
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"], "property `prop-404` not found");
}

#[tokio::test]
async fn advancing_with_outstanding_documents_is_unprocessable() {
    let (router, _) = app();
    let booking = reserve(&router, "prop-1").await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/purchases",
            json!({ "booking_id": booking["id"], "payment_method": "installment" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let purchase = read_json(response).await;
    assert_eq!(purchase["current_step"], 1);
    let purchase_id = purchase["id"].as_str().expect("purchase id").to_string();

    let response = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/purchases/{purchase_id}/advance"),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/v1/purchases",
            json!({ "booking_id": booking["id"], "payment_method": "cash" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .oneshot(get(&format!("/api/v1/purchases/{purchase_id}/schedule.csv")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
}

#[tokio::test]
async fn comparison_rejects_a_fifth_property() {
    let (router, desk) = app();
    for index in 1..=4 {
        let response = router
            .clone()
            .oneshot(post_json(
                "/api/v1/comparison",
                json!({ "property_id": format!("prop-{index}") }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = router
        .oneshot(post_json("/api/v1/comparison", json!({ "property_id": "prop-5" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(desk.comparison().list().len(), 4);
}

#[tokio::test]
async fn template_route_returns_text() {
    let (router, _) = app();
    let response = router
        .oneshot(get("/api/v1/document-templates/passport?title=Anketa"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), 1 << 16)
        .await
        .expect("read body");
    let text = String::from_utf8(body.to_vec()).expect("utf-8");
    assert!(text.starts_with("Anketa\n"));
}

#[tokio::test]
async fn cabinet_route_summarises_bookings() {
    let (router, _) = app();
    reserve(&router, "prop-3").await;
    let response = router
        .oneshot(get("/api/v1/cabinet"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let summary = read_json(response).await;
    assert_eq!(summary["active_bookings"].as_array().map(Vec::len), Some(1));
    assert_eq!(summary["outstanding_amount"], 50_000);
}
