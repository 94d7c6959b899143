//! Entry-gate ticket verification.
//!
//! Decodes the scanned proof, finds the booking it names, and admits the
//! holder exactly once. The proof is not signed, so everything it claims is
//! cross-checked against the stored booking before the flip. The flip
//! itself is a single conditional update in the store; two gates scanning
//! the same ticket race on that update and exactly one of them wins.

use chrono::{DateTime, Utc};
use stagepass_core::error::{ConflictKind, CoreError};
use stagepass_core::proof;
use stagepass_core::types::{BookingSummary, EventId};

use crate::environment::Environment;

/// Verifies scanned proofs at the venue door
#[derive(Clone)]
pub struct VerificationGate {
    env: Environment,
}

impl VerificationGate {
    /// Creates a gate over the given environment.
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Admits the ticket in the scanned proof, once.
    ///
    /// `expected_event_id` is the event this gate is posted at; a valid
    /// ticket for some other event is refused without being consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedProof`] for undecodable input,
    /// [`CoreError::NotFound`] when no active booking holds the ticket,
    /// [`CoreError::EventMismatch`] when the proof, the booking, and the
    /// gate disagree about the event, and
    /// [`CoreError::Conflict`] with [`ConflictKind::TicketAlreadyUsed`] on
    /// a second scan.
    pub async fn verify(
        &self,
        proof_text: &str,
        expected_event_id: EventId,
    ) -> Result<BookingSummary, CoreError> {
        let payload = proof::decode(proof_text)?;

        let booking = self
            .env
            .store()
            .booking_by_ticket(&payload.ticket_id)
            .await?
            .filter(|b| !b.is_cancelled())
            .ok_or_else(|| CoreError::not_found("ticket", &payload.ticket_id))?;

        if payload.event_id != booking.event_id {
            return Err(CoreError::EventMismatch {
                expected: payload.event_id,
                actual: booking.event_id,
            });
        }
        if expected_event_id != booking.event_id {
            return Err(CoreError::EventMismatch {
                expected: expected_event_id,
                actual: booking.event_id,
            });
        }
        if booking.verified {
            return Err(ConflictKind::TicketAlreadyUsed.into());
        }

        let verified_at = self.env.clock().now();
        let admitted = self
            .env
            .store()
            .mark_verified(&payload.ticket_id, verified_at)
            .await?;

        tracing::info!(
            booking_id = %admitted.id,
            event_id = %admitted.event_id,
            quantity = admitted.total_quantity,
            "ticket admitted"
        );

        Ok(BookingSummary {
            booking_id: admitted.id,
            event_id: admitted.event_id,
            user_id: admitted.user_id,
            lines: admitted.lines,
            total_quantity: admitted.total_quantity,
            verified_at,
        })
    }
}
