//! API routes module - organizes all route handlers.

pub mod app_state;
pub mod error;
pub mod flights;
pub mod payments;
pub mod tickets;

use axum::{Router, routing::get};

pub use app_state::AppState;

/// Create the main API router combining all route modules.
///
/// State is applied by callers (e.g. `main`, TestServer) with
/// `.with_state(app_state)` after nesting.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/flights", flights::flights_router())
        .nest("/payments", payments::payments_router())
        .nest("/tickets", tickets::tickets_router())
        .route("/users/{user_id}/tickets", get(tickets::list_user_tickets))
}
