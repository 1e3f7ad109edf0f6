//! Ticket routes: purchase, listing, cancellation, check-in and payment
//! status.

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::models::enums::PaymentKind;
use crate::services::settlement::PurchaseRequest;

use super::app_state::AppState;
use super::error::ApiError;

/// Request body for check-in.
#[derive(Debug, Default, Deserialize)]
pub struct CheckInRequest {
    #[serde(default)]
    pub bag_count: i32,
}

/// Create the tickets router
pub fn tickets_router() -> Router<AppState> {
    Router::new()
        .route("/", post(purchase_ticket).get(list_tickets))
        .route("/{ticket_id}/cancel", post(cancel_ticket))
        .route("/{ticket_id}/checkin", post(check_in))
        .route("/{ticket_id}/payment", get(payment_status))
}

/// POST /tickets - purchase a ticket (the single authoritative settlement path)
async fn purchase_ticket(
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<Value>, ApiError> {
    info!(
        flight_id = ?request.flight_id,
        user_id = ?request.user_id,
        method = ?request.payment_method,
        "purchase attempt"
    );

    let receipt = state.settlement.purchase(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Ticket purchased successfully",
        "receipt": receipt,
    })))
}

/// GET /tickets - all tickets with flight and passenger context
async fn list_tickets(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let tickets = state.storage.list_tickets().await?;
    Ok(Json(json!({
        "success": true,
        "total": tickets.len(),
        "tickets": tickets,
    })))
}

/// GET /users/:user_id/tickets - one user's tickets, newest first
pub async fn list_user_tickets(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let tickets = state.storage.list_tickets_for_user(user_id).await?;
    Ok(Json(json!({
        "success": true,
        "total": tickets.len(),
        "tickets": tickets,
    })))
}

/// POST /tickets/:ticket_id/cancel - cancel a ticket and report the refund
async fn cancel_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let refund = state.settlement.cancel(ticket_id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Ticket cancelled successfully",
        "refund": refund,
    })))
}

/// POST /tickets/:ticket_id/checkin - check a passenger in
async fn check_in(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
    body: Option<Json<CheckInRequest>>,
) -> Result<Json<Value>, ApiError> {
    let bag_count = body.map(|Json(b)| b.bag_count).unwrap_or(0);
    let receipt = state.settlement.check_in(ticket_id, bag_count).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Check-in completed successfully",
        "checkin": receipt,
    })))
}

/// GET /tickets/:ticket_id/payment - settlement status for a ticket.
///
/// Bank-slip purchases settle asynchronously and report as pending;
/// everything else is confirmed at purchase time.
async fn payment_status(
    State(state): State<AppState>,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let (ticket, flight) = state
        .storage
        .get_ticket_with_flight(ticket_id)
        .await?
        .ok_or(ApiError {
            status: axum::http::StatusCode::NOT_FOUND,
            kind: "TICKET_NOT_FOUND",
            message: "ticket not found".to_string(),
        })?;

    let (status, message) = match PaymentKind::from_name(&ticket.payment_method) {
        PaymentKind::BankSlip => ("pending", "Awaiting bank slip settlement"),
        _ => ("confirmed", "Payment confirmed"),
    };

    Ok(Json(json!({
        "success": true,
        "ticket_id": ticket.id,
        "code": ticket.code(),
        "status": status,
        "payment_method": ticket.payment_method,
        "message": message,
        "details": {
            "flight": flight.code,
            "amount": ticket.final_price,
            "purchased_at": ticket.purchased_at,
        },
    })))
}
