//! Flight routes: listing, detail and the check-in manifest.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde_json::{Value, json};

use super::app_state::AppState;
use super::error::ApiError;

/// Create the flights router
pub fn flights_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_flights))
        .route("/{flight_id}", get(get_flight))
        .route("/{flight_id}/checkins", get(list_flight_checkins))
}

/// GET /flights - all flights, soonest departure first
async fn list_flights(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let flights = state.storage.list_flights().await?;
    Ok(Json(json!({
        "success": true,
        "total": flights.len(),
        "flights": flights,
    })))
}

/// GET /flights/:flight_id - a single flight
async fn get_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let flight = state
        .storage
        .get_flight(flight_id)
        .await?
        .ok_or(ApiError {
            status: StatusCode::NOT_FOUND,
            kind: "FLIGHT_NOT_FOUND",
            message: "flight not found".to_string(),
        })?;
    Ok(Json(json!({
        "success": true,
        "flight": flight,
    })))
}

/// GET /flights/:flight_id/checkins - check-in manifest for attendants
async fn list_flight_checkins(
    State(state): State<AppState>,
    Path(flight_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let checkins = state.storage.list_checkins_for_flight(flight_id).await?;
    Ok(Json(json!({
        "success": true,
        "total": checkins.len(),
        "checkins": checkins,
    })))
}
