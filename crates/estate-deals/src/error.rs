use crate::config::ConfigError;
use crate::store::StorageError;
use crate::telemetry::TelemetryError;
use crate::workflows::bookings::BookingStatus;
use crate::workflows::documents::DocumentStatus;
use crate::workflows::purchase::{PurchaseStatus, StageKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

/// Kinds of records an operation can fail to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Property,
    Booking,
    Purchase,
    Document,
    Payment,
    ShortlistItem,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Property => "property",
            Entity::Booking => "booking",
            Entity::Purchase => "purchase",
            Entity::Document => "document",
            Entity::Payment => "payment",
            Entity::ShortlistItem => "shortlist item",
        };
        f.write_str(name)
    }
}

/// Broken domain rules. Always recoverable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("comparison holds at most {limit} properties")]
    ComparisonFull { limit: usize },
    #[error("booking `{id}` is {} and cannot be {action}", .status.label())]
    BookingClosed {
        id: String,
        status: BookingStatus,
        action: &'static str,
    },
    #[error("purchase `{id}` is {} and cannot change", .status.label())]
    PurchaseClosed { id: String, status: PurchaseStatus },
    #[error("document `{id}` cannot move from {} to {}", .from.label(), .to.label())]
    DocumentTransition {
        id: String,
        from: DocumentStatus,
        to: DocumentStatus,
    },
    #[error("payment `{id}` was cancelled and cannot be paid")]
    PaymentCancelled { id: String },
    #[error("initial payment {initial} exceeds the total {total}")]
    InitialExceedsTotal { initial: u64, total: u64 },
    #[error("purchase `{id}` is not financed by mortgage")]
    NotMortgageFinanced { id: String },
    #[error("estimated completion {days} days ahead is out of the calendar range")]
    CompletionOutOfRange { days: i64 },
}

/// Errors produced by the deal lifecycle components.
#[derive(Debug, thiserror::Error)]
pub enum DealError {
    #[error("{entity} `{id}` not found")]
    NotFound { entity: Entity, id: String },
    #[error(transparent)]
    InvariantViolation(#[from] Violation),
    #[error("stage \"{}\" cannot complete: {reason}", .stage.title())]
    PreconditionNotMet { stage: StageKind, reason: String },
    #[error("records were left partially written: {0}")]
    PartialFailure(StorageError),
    #[error(transparent)]
    Storage(StorageError),
}

impl DealError {
    pub(crate) fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        DealError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<StorageError> for DealError {
    fn from(value: StorageError) -> Self {
        match value {
            partial @ StorageError::Partial { .. } => DealError::PartialFailure(partial),
            other => DealError::Storage(other),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Deal(DealError),
    Export(csv::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Deal(err) => write!(f, "deal error: {}", err),
            AppError::Export(err) => write!(f, "export error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Deal(err) => Some(err),
            AppError::Export(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Deal(DealError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Deal(DealError::InvariantViolation(_)) => StatusCode::CONFLICT,
            AppError::Deal(DealError::PreconditionNotMet { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Deal(DealError::PartialFailure(_) | DealError::Storage(_))
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Deal(err) => err.to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<DealError> for AppError {
    fn from(value: DealError) -> Self {
        Self::Deal(value)
    }
}

impl From<csv::Error> for AppError {
    fn from(value: csv::Error) -> Self {
        Self::Export(value)
    }
}

impl From<StorageError> for AppError {
    fn from(value: StorageError) -> Self {
        Self::Deal(DealError::from(value))
    }
}
