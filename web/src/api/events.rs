//! Event-side API endpoints.
//!
//! - GET /api/events/:id/availability - Remaining seats, derived on demand
//! - POST /api/events/:id/cancel-bookings - Cancel every active booking

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use stagepass_core::{EventId, UserId};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Seat availability for a single pool.
#[derive(Debug, Serialize)]
pub struct PoolAvailabilityResponse {
    /// Category name, `null` for a flat pool
    pub category: Option<String>,
    /// Seats the pool was created with
    pub capacity: u32,
    /// Seats held by active bookings
    pub reserved: u32,
    /// Seats still on sale
    pub available: u32,
}

/// Availability across every pool of one event.
#[derive(Debug, Serialize)]
pub struct EventAvailabilityResponse {
    /// Event ID
    pub event_id: Uuid,
    /// Availability by pool
    pub pools: Vec<PoolAvailabilityResponse>,
    /// Seats held by bookings whose shape no longer matches the plan
    pub unattributed: u32,
    /// Total available across all pools
    pub total_available: u32,
}

/// Request to cancel every active booking of an event.
#[derive(Debug, Deserialize)]
pub struct CancelEventBookingsRequest {
    /// The organizer or admin requesting the cancellation
    pub requested_by: Uuid,
    /// Optional reason recorded on every affected booking
    pub reason: Option<String>,
}

/// Response after a bulk cancellation.
#[derive(Debug, Serialize)]
pub struct CancelEventBookingsResponse {
    /// The cancelled event
    pub event_id: Uuid,
    /// How many active bookings were marked for deferred refunds
    pub bookings_cancelled: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get seat availability for an event.
///
/// Derived from active bookings at request time; cancelled seats are
/// immediately back in the count.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/events/550e8400-e29b-41d4-a716-446655440000/availability
/// ```
///
/// Response:
/// ```json
/// {
///   "event_id": "550e8400-e29b-41d4-a716-446655440000",
///   "pools": [
///     {"category": "VIP", "capacity": 100, "reserved": 10, "available": 90},
///     {"category": "General", "capacity": 500, "reserved": 50, "available": 450}
///   ],
///   "unattributed": 0,
///   "total_available": 540
/// }
/// ```
pub async fn get_event_availability(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<EventAvailabilityResponse>, AppError> {
    let report = state
        .availability
        .availability(EventId::from_uuid(event_id))
        .await?;

    let total_available = report.pools.iter().map(|p| p.available).sum();
    let pools = report
        .pools
        .into_iter()
        .map(|p| PoolAvailabilityResponse {
            category: p.category,
            capacity: p.capacity,
            reserved: p.reserved,
            available: p.available,
        })
        .collect();

    Ok(Json(EventAvailabilityResponse {
        event_id: *report.event_id.as_uuid(),
        pools,
        unattributed: report.unattributed,
        total_available,
    }))
}

/// Cancel every active booking of an event.
///
/// Allowed for the event's organizer and for admins. Refunds are left
/// pending for offline settlement; this call never talks to the payment
/// gateway.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/550e8400-e29b-41d4-a716-446655440000/cancel-bookings \
///   -H "Content-Type: application/json" \
///   -d '{"requested_by": "880e8400-e29b-41d4-a716-446655440003", "reason": "venue flooded"}'
/// ```
pub async fn cancel_event_bookings(
    Path(event_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<CancelEventBookingsRequest>,
) -> Result<Json<CancelEventBookingsResponse>, AppError> {
    let outcome = state
        .cancellations
        .cancel_event_bookings(
            EventId::from_uuid(event_id),
            UserId::from_uuid(request.requested_by),
            request.reason,
        )
        .await?;

    Ok(Json(CancelEventBookingsResponse {
        event_id: *outcome.event_id.as_uuid(),
        bookings_cancelled: outcome.bookings_cancelled,
    }))
}
