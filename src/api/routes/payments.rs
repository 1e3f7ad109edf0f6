//! Payment routes: available settlement channels.

use axum::{Router, extract::State, response::Json, routing::get};
use serde_json::{Value, json};

use super::app_state::AppState;
use super::error::ApiError;

/// Create the payments router
pub fn payments_router() -> Router<AppState> {
    Router::new().route("/methods", get(list_methods))
}

/// GET /payments/methods - active payment methods with their discount blurbs
async fn list_methods(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let methods = state.storage.list_payment_methods().await?;
    let methods: Vec<Value> = methods
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "name": m.name,
                "max_installments": m.max_installments,
                "benefit": m.benefit(),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "payment_methods": methods,
    })))
}
