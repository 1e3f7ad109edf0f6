//! API error handling utilities.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::settlement::SettlementError;
use crate::storage::StorageError;

/// API error response. Every failure carries a consistent `success` flag, a
/// stable kind and a human-readable message.
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "kind": self.kind,
            "message": self.message,
        });

        (self.status, axum::Json(body)).into_response()
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        let status = match &err {
            SettlementError::FlightNotFound
            | SettlementError::UserNotFound
            | SettlementError::TicketNotFound => StatusCode::NOT_FOUND,
            SettlementError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            SettlementError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let status = match &err {
            StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            kind: "STORAGE_FAILURE",
            message: err.to_string(),
        }
    }
}
