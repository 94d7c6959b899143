//! Gate-side ticket verification endpoint.
//!
//! - POST /api/tickets/verify - Admit a scanned proof exactly once

use crate::api::bookings::{booking_lines, BookingLine};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagepass_core::EventId;
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// A scanned proof, submitted by the gate at a specific event.
#[derive(Debug, Deserialize)]
pub struct VerifyTicketRequest {
    /// The proof text exactly as scanned from the barcode
    pub proof: String,
    /// The event this gate admits to
    pub event_id: Uuid,
}

/// Summary shown to the gate operator after a successful scan.
#[derive(Debug, Serialize)]
pub struct VerifyTicketResponse {
    /// The verified booking
    pub booking_id: Uuid,
    /// Event the ticket admits to
    pub event_id: Uuid,
    /// Ticket holder
    pub user_id: Uuid,
    /// Seats being admitted
    pub lines: Vec<BookingLine>,
    /// Total seats being admitted
    pub total_quantity: u32,
    /// When this scan verified the ticket
    pub verified_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Verify a scanned proof and mark its ticket used.
///
/// The flip is one-way: a second scan of the same ticket conflicts with
/// code `TICKET_ALREADY_USED`, whoever presents it. A proof scanned at the
/// wrong event is rejected without consuming the ticket.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/tickets/verify \
///   -H "Content-Type: application/json" \
///   -d '{"proof": "eyJ0aWNrZXRJZCI6...", "event_id": "550e8400-e29b-41d4-a716-446655440000"}'
/// ```
pub async fn verify_ticket(
    State(state): State<AppState>,
    Json(request): Json<VerifyTicketRequest>,
) -> Result<Json<VerifyTicketResponse>, AppError> {
    let summary = state
        .verification
        .verify(&request.proof, EventId::from_uuid(request.event_id))
        .await?;

    Ok(Json(VerifyTicketResponse {
        booking_id: *summary.booking_id.as_uuid(),
        event_id: *summary.event_id.as_uuid(),
        user_id: *summary.user_id.as_uuid(),
        lines: booking_lines(&summary.lines),
        total_quantity: summary.total_quantity,
        verified_at: summary.verified_at,
    }))
}
