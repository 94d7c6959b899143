//! Booking self-service API endpoints.
//!
//! All of these act on behalf of the booking holder; `user_id` identifies
//! the caller and anyone else is rejected:
//! - GET /api/bookings/:id - Booking details
//! - POST /api/bookings/:id/cancel - Cancel and settle the refund
//! - GET /api/bookings/:id/refund-quote - Price a cancellation without cancelling
//! - GET /api/bookings/:id/refund-status - Where the refund stands

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stagepass_core::{BookingId, BookingLines, RefundQuote, UserId};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Caller identity for owner-gated reads.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    /// User the request acts on behalf of
    pub user_id: Uuid,
}

/// One line of a booking, flattened for JSON.
#[derive(Debug, Serialize)]
pub struct BookingLine {
    /// Category name, `null` for a flat pool
    pub category: Option<String>,
    /// Seats on this line
    pub quantity: u32,
    /// Price per seat in cents, captured at reservation time
    pub unit_price_cents: u64,
    /// Line subtotal in cents
    pub subtotal_cents: u64,
}

/// Flattens booking lines into one row per pool or category.
pub(crate) fn booking_lines(lines: &BookingLines) -> Vec<BookingLine> {
    match lines {
        BookingLines::Flat {
            quantity,
            unit_price,
        } => vec![BookingLine {
            category: None,
            quantity: *quantity,
            unit_price_cents: unit_price.cents(),
            subtotal_cents: unit_price.cents().saturating_mul(u64::from(*quantity)),
        }],
        BookingLines::Categorized { items } => items
            .iter()
            .map(|item| BookingLine {
                category: Some(item.category.clone()),
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
                subtotal_cents: item.subtotal.cents(),
            })
            .collect(),
    }
}

/// Booking details response.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking ID
    pub id: Uuid,
    /// Event the seats belong to
    pub event_id: Uuid,
    /// Booking holder
    pub user_id: Uuid,
    /// Opaque ticket token
    pub ticket_id: String,
    /// The reserved seats, line by line
    pub lines: Vec<BookingLine>,
    /// Total seats across all lines
    pub total_quantity: u32,
    /// Total charged amount in cents
    pub total_amount_cents: u64,
    /// Whether the ticket was scanned at the gate
    pub verified: bool,
    /// When the gate scan happened
    pub verified_at: Option<DateTime<Utc>>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// Whether the booking is cancelled (by the holder or the event)
    pub cancelled: bool,
    /// When the cancellation happened
    pub cancellation_date: Option<DateTime<Utc>>,
    /// Free-text reason recorded at cancellation
    pub cancellation_reason: Option<String>,
    /// Refund standing: none, pending, processed or failed
    pub refund_status: String,
    /// Refund amount in cents, once a cancellation fixed it
    pub refund_amount_cents: Option<u64>,
    /// Gateway reference for the refund, once issued
    pub refund_reference: Option<String>,
}

/// A refund computation, as quoted or applied.
#[derive(Debug, Serialize)]
pub struct RefundQuoteResponse {
    /// The window the cancellation falls into: early, standard or late
    pub tier: String,
    /// Percentage of the paid amount refunded
    pub percentage: u8,
    /// Amount refunded in cents
    pub amount_cents: u64,
    /// Fractional days between now and the event
    pub days_until_event: f64,
}

impl From<RefundQuote> for RefundQuoteResponse {
    fn from(quote: RefundQuote) -> Self {
        Self {
            tier: quote.tier.as_str().to_string(),
            percentage: quote.percentage,
            amount_cents: quote.amount.cents(),
            days_until_event: quote.days_until_event,
        }
    }
}

/// Request to cancel a booking.
#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    /// The booking holder
    pub user_id: Uuid,
    /// Optional cancellation reason
    pub reason: Option<String>,
}

/// Response after cancelling a booking.
#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    /// The cancelled booking
    pub booking_id: Uuid,
    /// When the cancellation took effect
    pub cancelled_at: DateTime<Utc>,
    /// The refund computation that applied
    pub refund: RefundQuoteResponse,
    /// Refund standing after the attempt: none, pending, processed or failed
    pub refund_status: String,
    /// Gateway reference for the refund, if one was issued
    pub refund_reference: Option<String>,
}

/// Refund standing response.
#[derive(Debug, Serialize)]
pub struct RefundStatusResponse {
    /// The booking the refund belongs to
    pub booking_id: Uuid,
    /// Refund standing: none, pending, processed or failed
    pub status: String,
    /// Amount owed or paid in cents, once a cancellation fixed it
    pub amount_cents: Option<u64>,
    /// Gateway reference, once the gateway accepted the refund
    pub reference: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get booking details, for the holder.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/bookings/660e8400-e29b-41d4-a716-446655440001?user_id=770e8400-e29b-41d4-a716-446655440002"
/// ```
pub async fn get_booking(
    Path(booking_id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .cancellations
        .booking_for_holder(
            BookingId::from_uuid(booking_id),
            UserId::from_uuid(owner.user_id),
        )
        .await?;

    Ok(Json(BookingResponse {
        id: *booking.id.as_uuid(),
        event_id: *booking.event_id.as_uuid(),
        user_id: *booking.user_id.as_uuid(),
        ticket_id: booking.ticket_id.into_string(),
        lines: booking_lines(&booking.lines),
        total_quantity: booking.total_quantity,
        total_amount_cents: booking.total_amount.cents(),
        verified: booking.verified,
        verified_at: booking.verified_at,
        created_at: booking.created_at,
        cancelled: booking.cancelled_by_user || booking.cancelled_by_event,
        cancellation_date: booking.cancellation_date,
        cancellation_reason: booking.cancellation_reason,
        refund_status: booking.refund_status.as_str().to_string(),
        refund_amount_cents: booking.refund_amount.map(|m| m.cents()),
        refund_reference: booking.refund_reference,
    }))
}

/// Cancel a booking and settle its refund.
///
/// The refund is priced from the amount paid at reservation time and the
/// event's policy at the moment of cancellation. A gateway failure still
/// cancels the booking; the refund is reported as `failed` for follow-up.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bookings/660e8400-e29b-41d4-a716-446655440001/cancel \
///   -H "Content-Type: application/json" \
///   -d '{"user_id": "770e8400-e29b-41d4-a716-446655440002", "reason": "plans changed"}'
/// ```
pub async fn cancel_booking(
    Path(booking_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<CancelBookingRequest>,
) -> Result<Json<CancelBookingResponse>, AppError> {
    let outcome = state
        .cancellations
        .cancel(
            BookingId::from_uuid(booking_id),
            UserId::from_uuid(request.user_id),
            request.reason,
        )
        .await?;

    Ok(Json(CancelBookingResponse {
        booking_id: *outcome.booking_id.as_uuid(),
        cancelled_at: outcome.cancelled_at,
        refund: outcome.quote.into(),
        refund_status: outcome.refund_status.as_str().to_string(),
        refund_reference: outcome.refund_reference,
    }))
}

/// Price what cancelling the booking right now would refund.
///
/// Nothing is mutated; the booking stays active.
pub async fn get_refund_quote(
    Path(booking_id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<RefundQuoteResponse>, AppError> {
    let quote = state
        .cancellations
        .refund_quote(
            BookingId::from_uuid(booking_id),
            UserId::from_uuid(owner.user_id),
        )
        .await?;
    Ok(Json(quote.into()))
}

/// Report where the booking's refund stands.
///
/// A pending refund with a gateway reference is re-checked against the
/// gateway before answering.
pub async fn get_refund_status(
    Path(booking_id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
    State(state): State<AppState>,
) -> Result<Json<RefundStatusResponse>, AppError> {
    let report = state
        .cancellations
        .refund_status(
            BookingId::from_uuid(booking_id),
            UserId::from_uuid(owner.user_id),
        )
        .await?;

    Ok(Json(RefundStatusResponse {
        booking_id: *report.booking_id.as_uuid(),
        status: report.status.as_str().to_string(),
        amount_cents: report.amount.map(|m| m.cents()),
        reference: report.reference,
    }))
}
