//! Error taxonomy for the reservation engine.
//!
//! Every operation exposed by the engine resolves to [`CoreError`]. Port
//! implementations report the narrower error types declared next to their
//! traits in [`crate::ports`]; those convert into this taxonomy at the
//! engine boundary.

use thiserror::Error;

use crate::types::EventId;

/// Conflicting state that terminates an attempt without being a caller bug
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// The user already holds an active booking for this event
    #[error("user already holds an active booking for this event")]
    DuplicateReservation,

    /// The requested seats no longer fit in the pool
    #[error("insufficient seats: requested {requested}, available {available}")]
    InventoryExceeded {
        /// Category the request overflowed, `None` for a flat pool
        category: Option<String>,
        /// Seats the request asked for
        requested: u32,
        /// Seats actually left in the pool
        available: u32,
    },

    /// The booking was already cancelled
    #[error("booking is already cancelled")]
    AlreadyCancelled,

    /// The ticket was already scanned and admitted
    #[error("ticket has already been used")]
    TicketAlreadyUsed,
}

/// Unified error type for engine operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Input failed validation before any side effect ran
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced entity does not exist
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of entity that was looked up
        resource: &'static str,
        /// Identifier that missed
        id: String,
    },

    /// The operation lost to conflicting state or a concurrent writer
    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    /// The acting user may not perform this operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The scanned payload, the stored booking, and the gate's event
    /// selection disagree
    #[error("ticket belongs to event {actual}, expected {expected}")]
    EventMismatch {
        /// Event the verifier expected
        expected: EventId,
        /// Event the booking actually belongs to
        actual: EventId,
    },

    /// The scanned payload could not be decoded
    #[error("malformed proof of purchase: {0}")]
    MalformedProof(String),

    /// The event no longer accepts this operation
    #[error("event closed: {0}")]
    EventClosed(String),

    /// An external collaborator failed
    #[error("{service} failed: {message}")]
    ExternalService {
        /// Which collaborator failed
        service: &'static str,
        /// What it reported
        message: String,
    },

    /// The persistent store failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Builds a [`CoreError::Validation`]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Builds a [`CoreError::NotFound`]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Builds a [`CoreError::Unauthorized`]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Builds a [`CoreError::ExternalService`]
    pub fn external(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
        }
    }

    /// Builds a [`CoreError::Storage`]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

impl From<ConflictKind> for CoreError {
    fn from(kind: ConflictKind) -> Self {
        Self::Conflict(kind)
    }
}
