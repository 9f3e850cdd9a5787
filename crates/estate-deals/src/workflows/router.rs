use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::bookings::BookingStatus;
use super::catalog::{ApartmentRef, PropertyCatalog, PropertySnapshot};
use super::documents::{generate_template, DocumentKind, DocumentStatus, FileMeta, StatusUpdate};
use super::payments::{PaymentMethod, PaymentState};
use super::purchase::{GateFlags, MortgageRequest};
use super::shortlist::{ShortlistEntry, ShortlistRegistry};
use super::{BookingId, DealDesk, DocumentId, PaymentId, PurchaseId, ShortlistItemId};
use crate::error::{AppError, DealError, Entity};
use crate::store::WriteOutcome;

#[derive(Clone)]
pub struct DealState {
    pub desk: Arc<DealDesk>,
    pub catalog: Arc<dyn PropertyCatalog>,
}

/// HTTP endpoints over the deal desk. Every handler is a thin translation to one desk call.
pub fn deal_router(desk: Arc<DealDesk>, catalog: Arc<dyn PropertyCatalog>) -> Router {
    Router::new()
        .route("/api/v1/bookings", post(reserve_handler).get(bookings_handler))
        .route("/api/v1/bookings/expire", post(expire_handler))
        .route("/api/v1/bookings/:booking_id", get(booking_handler))
        .route("/api/v1/bookings/:booking_id/extend", post(extend_handler))
        .route("/api/v1/bookings/:booking_id/cancel", post(cancel_booking_handler))
        .route("/api/v1/purchases", post(create_purchase_handler))
        .route("/api/v1/purchases/:purchase_id", get(purchase_handler))
        .route("/api/v1/purchases/:purchase_id/advance", post(advance_handler))
        .route("/api/v1/purchases/:purchase_id/progress", post(progress_handler))
        .route("/api/v1/purchases/:purchase_id/cancel", post(cancel_purchase_handler))
        .route("/api/v1/purchases/:purchase_id/mortgage", post(mortgage_handler))
        .route("/api/v1/purchases/:purchase_id/documents", get(purchase_documents_handler))
        .route("/api/v1/purchases/:purchase_id/payments", get(purchase_payments_handler))
        .route("/api/v1/purchases/:purchase_id/schedule.csv", get(schedule_csv_handler))
        .route("/api/v1/documents/:document_id/upload", post(upload_handler))
        .route("/api/v1/documents/:document_id/status", post(document_status_handler))
        .route("/api/v1/document-templates/:kind", get(template_handler))
        .route("/api/v1/payments", get(payments_handler))
        .route("/api/v1/payments/:payment_id/pay", post(pay_handler))
        .route("/api/v1/cabinet", get(cabinet_handler))
        .route(
            "/api/v1/favorites",
            get(list_favorites).post(add_favorite).delete(clear_favorites),
        )
        .route("/api/v1/favorites/:item_id", delete(remove_favorite))
        .route(
            "/api/v1/comparison",
            get(list_comparison).post(add_comparison).delete(clear_comparison),
        )
        .route("/api/v1/comparison/:item_id", delete(remove_comparison))
        .with_state(DealState { desk, catalog })
}

type HandlerResult = Result<Response, AppError>;

fn found<T>(value: Option<T>, entity: Entity, id: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::from(DealError::not_found(entity, id)))
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    pub property_id: String,
    pub apartment: ApartmentRef,
}

async fn reserve_handler(
    State(state): State<DealState>,
    Json(request): Json<ReserveRequest>,
) -> HandlerResult {
    let booking = state
        .desk
        .reserve(state.catalog.as_ref(), &request.property_id, &request.apartment)?;
    Ok((StatusCode::CREATED, Json(booking)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
}

async fn bookings_handler(
    State(state): State<DealState>,
    Query(filter): Query<BookingFilter>,
) -> HandlerResult {
    let bookings = match filter.status {
        Some(status) => state.desk.bookings().get_by_status(status),
        None => state.desk.bookings().all(),
    };
    Ok(Json(bookings).into_response())
}

async fn expire_handler(State(state): State<DealState>) -> HandlerResult {
    let expired = state.desk.bookings().mark_expired()?;
    Ok(Json(json!({ "expired": expired })).into_response())
}

async fn booking_handler(
    State(state): State<DealState>,
    Path(booking_id): Path<String>,
) -> HandlerResult {
    let id = BookingId(booking_id);
    let booking = found(state.desk.bookings().get_by_id(&id), Entity::Booking, id.as_str())?;
    Ok(Json(booking).into_response())
}

async fn extend_handler(
    State(state): State<DealState>,
    Path(booking_id): Path<String>,
) -> HandlerResult {
    let id = BookingId(booking_id);
    let booking = found(state.desk.bookings().extend(&id)?, Entity::Booking, id.as_str())?;
    Ok(Json(booking).into_response())
}

async fn cancel_booking_handler(
    State(state): State<DealState>,
    Path(booking_id): Path<String>,
) -> HandlerResult {
    let id = BookingId(booking_id);
    let booking = found(state.desk.bookings().cancel(&id)?, Entity::Booking, id.as_str())?;
    Ok(Json(booking).into_response())
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub booking_id: BookingId,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub initial_payment: Option<u64>,
}

async fn create_purchase_handler(
    State(state): State<DealState>,
    Json(request): Json<PurchaseRequest>,
) -> HandlerResult {
    let purchase = state.desk.purchases().create_from_booking(
        &request.booking_id,
        request.payment_method,
        request.initial_payment,
    )?;
    Ok((StatusCode::CREATED, Json(purchase)).into_response())
}

async fn purchase_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
) -> HandlerResult {
    let id = PurchaseId(purchase_id);
    let purchase = found(state.desk.purchases().get_by_id(&id), Entity::Purchase, id.as_str())?;
    Ok(Json(purchase).into_response())
}

async fn advance_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
    flags: Option<Json<GateFlags>>,
) -> HandlerResult {
    let flags = flags.map(|Json(flags)| flags).unwrap_or_default();
    let purchase = state
        .desk
        .purchases()
        .advance(&PurchaseId(purchase_id), flags)?;
    Ok(Json(purchase).into_response())
}

async fn progress_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
    flags: Option<Json<GateFlags>>,
) -> HandlerResult {
    let flags = flags.map(|Json(flags)| flags).unwrap_or_default();
    let progress = state
        .desk
        .purchases()
        .progress(&PurchaseId(purchase_id), flags)?;
    Ok(Json(progress).into_response())
}

async fn cancel_purchase_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
) -> HandlerResult {
    let purchase = state
        .desk
        .purchases()
        .cancel_purchase(&PurchaseId(purchase_id))?;
    Ok(Json(purchase).into_response())
}

async fn mortgage_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
    Json(request): Json<MortgageRequest>,
) -> HandlerResult {
    let application = state
        .desk
        .purchases()
        .submit_mortgage_application(&PurchaseId(purchase_id), request)?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

async fn purchase_documents_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
) -> HandlerResult {
    let id = PurchaseId(purchase_id);
    found(state.desk.purchases().get_by_id(&id), Entity::Purchase, id.as_str())?;
    let documents = state.desk.documents().for_purchase(&id);
    Ok(Json(json!({
        "all_satisfied": documents.iter().all(|document| !document.is_outstanding()),
        "documents": documents,
    }))
    .into_response())
}

async fn purchase_payments_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
) -> HandlerResult {
    let id = PurchaseId(purchase_id);
    found(state.desk.purchases().get_by_id(&id), Entity::Purchase, id.as_str())?;
    Ok(Json(state.desk.payments().get_by_purchase(&id)).into_response())
}

async fn schedule_csv_handler(
    State(state): State<DealState>,
    Path(purchase_id): Path<String>,
) -> HandlerResult {
    let id = PurchaseId(purchase_id);
    let csv = found(
        state.desk.payment_schedule_csv(&id)?,
        Entity::Purchase,
        id.as_str(),
    )?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv).into_response())
}

async fn upload_handler(
    State(state): State<DealState>,
    Path(document_id): Path<String>,
    Json(file): Json<FileMeta>,
) -> HandlerResult {
    let id = DocumentId(document_id);
    let document = found(
        state.desk.documents().upload_document(&id, file)?,
        Entity::Document,
        id.as_str(),
    )?;
    Ok(Json(document).into_response())
}

#[derive(Debug, Deserialize)]
pub struct DocumentStatusRequest {
    pub status: DocumentStatus,
    #[serde(flatten)]
    pub update: StatusUpdate,
}

async fn document_status_handler(
    State(state): State<DealState>,
    Path(document_id): Path<String>,
    Json(request): Json<DocumentStatusRequest>,
) -> HandlerResult {
    let id = DocumentId(document_id);
    let document = found(
        state
            .desk
            .documents()
            .update_status(&id, request.status, request.update)?,
        Entity::Document,
        id.as_str(),
    )?;
    Ok(Json(document).into_response())
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub title: Option<String>,
}

async fn template_handler(
    Path(kind): Path<DocumentKind>,
    Query(query): Query<TemplateQuery>,
) -> Response {
    let title = query.title.unwrap_or_else(|| kind.label().to_string());
    let body = generate_template(kind, &title);
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

#[derive(Debug, Deserialize)]
pub struct PaymentFilter {
    pub state: Option<PaymentState>,
}

async fn payments_handler(
    State(state): State<DealState>,
    Query(filter): Query<PaymentFilter>,
) -> HandlerResult {
    let payments = match filter.state {
        Some(payment_state) => state.desk.payments().get_by_status(payment_state),
        None => state.desk.payments().all(),
    };
    Ok(Json(payments).into_response())
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub method: String,
    pub transaction_id: String,
}

async fn pay_handler(
    State(state): State<DealState>,
    Path(payment_id): Path<String>,
    Json(request): Json<PayRequest>,
) -> HandlerResult {
    let id = PaymentId(payment_id);
    let payment = found(
        state
            .desk
            .payments()
            .mark_as_paid(&id, &request.method, &request.transaction_id)?,
        Entity::Payment,
        id.as_str(),
    )?;
    Ok(Json(payment).into_response())
}

async fn cabinet_handler(State(state): State<DealState>) -> HandlerResult {
    Ok(Json(state.desk.cabinet()?).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ShortlistRequest {
    pub property_id: String,
}

fn lookup(state: &DealState, property_id: &str) -> Result<PropertySnapshot, AppError> {
    found(state.catalog.lookup(property_id), Entity::Property, property_id)
}

fn add_entry<T: ShortlistEntry>(
    registry: &ShortlistRegistry<T>,
    property: &PropertySnapshot,
) -> HandlerResult {
    let entry = registry.add(property)?;
    Ok((StatusCode::CREATED, Json(entry)).into_response())
}

fn remove_entry<T: ShortlistEntry>(registry: &ShortlistRegistry<T>, item_id: String) -> HandlerResult {
    let outcome = registry.remove(&ShortlistItemId(item_id))?;
    Ok(Json(json!({ "removed": outcome == WriteOutcome::Applied })).into_response())
}

fn clear_entries<T: ShortlistEntry>(registry: &ShortlistRegistry<T>) -> HandlerResult {
    registry.clear()?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_favorites(State(state): State<DealState>) -> HandlerResult {
    Ok(Json(state.desk.favorites().list()).into_response())
}

async fn add_favorite(
    State(state): State<DealState>,
    Json(request): Json<ShortlistRequest>,
) -> HandlerResult {
    let property = lookup(&state, &request.property_id)?;
    add_entry(state.desk.favorites(), &property)
}

async fn remove_favorite(
    State(state): State<DealState>,
    Path(item_id): Path<String>,
) -> HandlerResult {
    remove_entry(state.desk.favorites(), item_id)
}

async fn clear_favorites(State(state): State<DealState>) -> HandlerResult {
    clear_entries(state.desk.favorites())
}

async fn list_comparison(State(state): State<DealState>) -> HandlerResult {
    Ok(Json(state.desk.comparison().list()).into_response())
}

async fn add_comparison(
    State(state): State<DealState>,
    Json(request): Json<ShortlistRequest>,
) -> HandlerResult {
    let property = lookup(&state, &request.property_id)?;
    add_entry(state.desk.comparison(), &property)
}

async fn remove_comparison(
    State(state): State<DealState>,
    Path(item_id): Path<String>,
) -> HandlerResult {
    remove_entry(state.desk.comparison(), item_id)
}

async fn clear_comparison(State(state): State<DealState>) -> HandlerResult {
    clear_entries(state.desk.comparison())
}

#[cfg(test)]
mod tests;
