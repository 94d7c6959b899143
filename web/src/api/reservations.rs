//! Reservation API endpoints.
//!
//! - POST /api/reservations - Reserve seats and issue a ticket

use crate::api::bookings::{booking_lines, BookingLine};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagepass_core::{EventId, UserId};
use stagepass_engine::{CategorySelection, ReservationRequest, SeatSelection};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to reserve seats on an event.
///
/// Exactly one of `quantity` (flat seating) or `categories` (categorized
/// seating) must be present, matching how the event sells its seats.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    /// Event to reserve seats for
    pub event_id: Uuid,
    /// User making the reservation
    pub user_id: Uuid,
    /// Seat count for a flat-seating event
    pub quantity: Option<u32>,
    /// Per-category seat counts for a categorized event
    pub categories: Option<Vec<CategorySeats>>,
    /// Gateway reference from the purchase, kept for routing refunds
    pub payment_reference: Option<String>,
}

/// Requested seats in one category.
#[derive(Debug, Deserialize)]
pub struct CategorySeats {
    /// Category name as listed on the event
    pub category: String,
    /// Number of seats
    pub quantity: u32,
}

/// Response after a successful reservation.
#[derive(Debug, Serialize)]
pub struct CreateReservationResponse {
    /// Created booking ID
    pub booking_id: Uuid,
    /// Event the seats belong to
    pub event_id: Uuid,
    /// Booking holder
    pub user_id: Uuid,
    /// Opaque ticket token printed on the proof
    pub ticket_id: String,
    /// The reserved seats, line by line
    pub lines: Vec<BookingLine>,
    /// Total seats across all lines
    pub total_quantity: u32,
    /// Total charged amount in cents
    pub total_amount_cents: u64,
    /// Encoded proof-of-purchase payload, scanned at the gate
    pub proof: String,
    /// The proof rendered as a QR barcode (SVG markup)
    pub barcode_svg: String,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Reserve seats and issue a ticket.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/reservations \
///   -H "Content-Type: application/json" \
///   -d '{
///     "event_id": "550e8400-e29b-41d4-a716-446655440000",
///     "user_id": "660e8400-e29b-41d4-a716-446655440001",
///     "categories": [{"category": "VIP", "quantity": 2}],
///     "payment_reference": "pay_abc123"
///   }'
/// ```
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<CreateReservationResponse>), AppError> {
    let seats = match (request.quantity, request.categories) {
        (Some(quantity), None) => SeatSelection::Flat { quantity },
        (None, Some(items)) => SeatSelection::Categorized {
            items: items
                .into_iter()
                .map(|c| CategorySelection {
                    category: c.category,
                    quantity: c.quantity,
                })
                .collect(),
        },
        _ => {
            return Err(AppError::bad_request(
                "Provide either quantity or categories, not both",
            ));
        }
    };

    let confirmation = state
        .reservations
        .create(ReservationRequest {
            event_id: EventId::from_uuid(request.event_id),
            user_id: UserId::from_uuid(request.user_id),
            seats,
            payment_reference: request.payment_reference,
        })
        .await?;

    let booking = confirmation.booking;
    Ok((
        StatusCode::CREATED,
        Json(CreateReservationResponse {
            booking_id: *booking.id.as_uuid(),
            event_id: *booking.event_id.as_uuid(),
            user_id: *booking.user_id.as_uuid(),
            ticket_id: booking.ticket_id.into_string(),
            lines: booking_lines(&booking.lines),
            total_quantity: booking.total_quantity,
            total_amount_cents: booking.total_amount.cents(),
            proof: booking.proof_payload,
            barcode_svg: confirmation.barcode_svg,
            created_at: booking.created_at,
        }),
    ))
}
