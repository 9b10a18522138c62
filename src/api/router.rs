use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, cancel_reservation, create_issue, create_reservation, fulfill_reservation,
    get_issue, list_active_issues, list_overdue_issues, list_pending_reservations,
    list_user_reservations, return_issue,
};

/// Creates the API router with all circulation endpoints
///
/// Command endpoints (Write operations):
/// - POST /issues - Create a new issue
/// - POST /issues/:id/return - Return a copy
/// - POST /reservations - Create a new reservation
/// - POST /reservations/:id/cancel - Cancel a reservation
/// - POST /reservations/:id/fulfill - Fulfill a reservation (staff only)
///
/// Query endpoints (Read operations):
/// - GET /issues/:id - Get issue details
/// - GET /issues/overdue - List overdue issues (staff only)
/// - GET /users/:id/issues - List a user's active issues
/// - GET /users/:id/reservations - List a user's reservations
/// - GET /books/:id/reservations/pending - List pending reservations (FIFO)
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Command endpoints (Write operations)
        .route("/issues", post(create_issue))
        .route("/issues/:id/return", post(return_issue))
        .route("/reservations", post(create_reservation))
        .route("/reservations/:id/cancel", post(cancel_reservation))
        .route("/reservations/:id/fulfill", post(fulfill_reservation))
        // Query endpoints (Read operations)
        .route("/issues/overdue", get(list_overdue_issues))
        .route("/issues/:id", get(get_issue))
        .route("/users/:id/issues", get(list_active_issues))
        .route("/users/:id/reservations", get(list_user_reservations))
        .route(
            "/books/:id/reservations/pending",
            get(list_pending_reservations),
        )
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
