//! Ticket identity issuance.
//!
//! Tokens are 256-bit random values encoded as base64url (43 characters),
//! far past the 128-bit floor that makes guessing a live ticket infeasible.
//! The issuer probes the store before handing a token out, but the probe is
//! an optimization: the store's uniqueness constraint is what actually
//! guarantees no two bookings ever share a ticket id, and inserts that lose
//! that race are retried with a fresh draw.

use base64::Engine;
use rand::RngCore;

use crate::error::CoreError;
use crate::ports::BookingStore;
use crate::types::TicketId;

/// Raw entropy per token, in bytes
pub const TOKEN_BYTES: usize = 32;

const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Draws candidate ticket ids until one is unissued
#[derive(Clone, Copy, Debug)]
pub struct TicketIssuer {
    max_attempts: u32,
}

impl TicketIssuer {
    /// Creates an issuer that gives up after `max_attempts` collisions.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Draws one random candidate token.
    #[must_use]
    pub fn draw() -> TicketId {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.fill_bytes(&mut bytes);
        TicketId::from_token(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Draws tokens until the store reports one as unissued.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Storage`] when the store fails or every attempt
    /// collided.
    pub async fn issue(&self, store: &dyn BookingStore) -> Result<TicketId, CoreError> {
        for _ in 0..self.max_attempts {
            let candidate = Self::draw();
            if !store.ticket_id_exists(&candidate).await? {
                return Ok(candidate);
            }
        }
        Err(CoreError::storage(
            "exhausted attempts drawing a unique ticket id",
        ))
    }
}

impl Default for TicketIssuer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
