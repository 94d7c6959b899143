//! Router configuration for the StagePass server.

use crate::api::{bookings, events, health, reservations, tickets};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builds the complete router: every endpoint, traced and CORS-open.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        // Booking self-service
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route(
            "/bookings/:id/refund-quote",
            get(bookings::get_refund_quote),
        )
        .route(
            "/bookings/:id/refund-status",
            get(bookings::get_refund_status),
        )
        // Gate-side verification
        .route("/tickets/verify", post(tickets::verify_ticket))
        // Event availability and bulk cancellation
        .route(
            "/events/:id/availability",
            get(events::get_event_availability),
        )
        .route(
            "/events/:id/cancel-bookings",
            post(events::cancel_event_bookings),
        );

    Router::new()
        // Health check (no state)
        .route("/health", get(health::health_check))
        // API routes under /api prefix
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
