//! Collaborator contracts for the reservation engine.
//!
//! Every handler runs short-lived and shares nothing in process, so all
//! coordination goes through the booking store. The traits here are the
//! seams: the engine talks to a [`BookingStore`], an [`EventCatalog`], a
//! [`UserDirectory`], a [`PaymentGateway`], and a [`Notifier`], all as
//! `Arc<dyn Trait>` so implementations can be swapped wholesale in tests.
//!
//! # Atomicity contract
//!
//! Three races are closed by the store, not by callers:
//!
//! - [`BookingStore::insert_booking`] re-validates capacity and the
//!   one-active-booking-per-user rule inside its own critical section, so
//!   two writers at the capacity boundary cannot both commit.
//! - Ticket-id uniqueness is a store constraint. [`StoreError::TicketIdTaken`]
//!   tells the caller to draw a fresh token and retry; the pre-insert
//!   existence probe is only an optimization.
//! - [`BookingStore::mark_verified`] flips the verified flag with a single
//!   conditional update, so a ticket scanned twice concurrently admits once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use crate::error::ConflictKind;
use crate::types::{
    Booking, BookingId, EventId, EventSnapshot, Money, RefundStatus, Role, SeatPlan, TicketId,
    UserId,
};

// ============================================================================
// Booking Store
// ============================================================================

/// Errors reported by booking store implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A guarded write lost to existing state or a concurrent writer
    #[error("conflict: {0}")]
    Conflict(#[from] ConflictKind),

    /// The uniqueness constraint rejected the drawn ticket id
    #[error("ticket id already issued")]
    TicketIdTaken,

    /// A guarded update targeted a booking that does not exist
    #[error("booking not found: {0}")]
    BookingNotFound(String),

    /// The underlying database failed
    #[error("database error: {0}")]
    Database(String),
}

impl From<StoreError> for crate::error::CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(kind) => Self::Conflict(kind),
            StoreError::TicketIdTaken => {
                Self::storage("ticket id uniqueness constraint rejected an insert")
            }
            StoreError::BookingNotFound(id) => Self::NotFound {
                resource: "booking",
                id,
            },
            StoreError::Database(message) => Self::Storage(message),
        }
    }
}

/// Fields written when a single booking is cancelled
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancellationUpdate {
    /// When the cancellation took effect
    pub cancelled_at: DateTime<Utc>,
    /// Free-text reason, if the holder gave one
    pub reason: Option<String>,
    /// Refund standing recorded together with the cancellation
    pub refund_status: RefundStatus,
    /// Refund amount recorded together with the cancellation
    pub refund_amount: Money,
}

/// Durable home of bookings.
///
/// Bookings are never deleted; cancellation and verification are guarded
/// in-place updates. See the module docs for the atomicity contract.
pub trait BookingStore: Send + Sync {
    /// Atomically validates capacity and the duplicate-reservation rule
    /// against `plan`, then inserts the booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the seats no longer fit or the
    /// user already holds an active booking, [`StoreError::TicketIdTaken`]
    /// when the drawn ticket id collides, and [`StoreError::Database`] on
    /// infrastructure failure.
    fn insert_booking<'a>(
        &'a self,
        booking: &'a Booking,
        plan: &'a SeatPlan,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>>;

    /// Whether a ticket id has ever been issued, on any booking, cancelled
    /// or not.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn ticket_id_exists<'a>(
        &'a self,
        ticket_id: &'a TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + 'a>>;

    /// Loads a booking by its id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn booking_by_id(
        &self,
        id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + '_>>;

    /// Loads a booking by its ticket id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn booking_by_ticket<'a>(
        &'a self,
        ticket_id: &'a TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + 'a>>;

    /// Whether the user currently holds an active booking for the event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn has_active_booking(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + '_>>;

    /// All active bookings of an event, for availability computation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn active_bookings_for_event(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>>;

    /// Flips the verified flag false→true in one conditional update and
    /// returns the booking as admitted.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictKind::TicketAlreadyUsed`] when the flag was already
    /// set, [`ConflictKind::AlreadyCancelled`] when the booking was cancelled
    /// in the meantime, and [`StoreError::BookingNotFound`] when the ticket
    /// id matches nothing.
    fn mark_verified<'a>(
        &'a self,
        ticket_id: &'a TicketId,
        verified_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + 'a>>;

    /// Marks a booking cancelled by its holder and records the refund
    /// standing, guarded against double cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictKind::AlreadyCancelled`] when another writer
    /// cancelled first and [`StoreError::BookingNotFound`] when the id
    /// matches nothing.
    fn cancel_booking(
        &self,
        id: BookingId,
        update: CancellationUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + '_>>;

    /// Records the gateway's answer for a refund that was claimed at
    /// cancellation time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BookingNotFound`] when the id matches nothing.
    fn record_refund_outcome(
        &self,
        id: BookingId,
        status: RefundStatus,
        reference: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>>;

    /// Marks every active booking of the event cancelled-by-event with a
    /// pending refund, in one statement, and returns how many were touched.
    ///
    /// No gateway calls happen here; deferred refunds are settled out of
    /// band.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn cancel_event_bookings(
        &self,
        event_id: EventId,
        cancelled_at: DateTime<Utc>,
        reason: String,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>>;
}

// ============================================================================
// Event Catalog and User Directory
// ============================================================================

/// Read-only view of the event catalog
pub trait EventCatalog: Send + Sync {
    /// Loads the current snapshot of an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn event_by_id(
        &self,
        id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventSnapshot>, StoreError>> + Send + '_>>;
}

/// Read-only view of the user directory
pub trait UserDirectory: Send + Sync {
    /// The user's role, or `None` when the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on infrastructure failure.
    fn role_of(
        &self,
        id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Role>, StoreError>> + Send + '_>>;
}

// ============================================================================
// Payment Gateway
// ============================================================================

/// Payment gateway result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors reported by the payment gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway refused the refund
    #[error("refund rejected: {reason}")]
    Rejected {
        /// Why the gateway refused
        reason: String,
    },

    /// The gateway did not answer in time
    #[error("gateway timeout")]
    Timeout,

    /// Anything else the gateway reported
    #[error("gateway error: {message}")]
    Other {
        /// What it reported
        message: String,
    },
}

/// Where the gateway says a refund stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayRefundStatus {
    /// Accepted, not yet settled
    Pending,
    /// Settled back to the payer
    Completed,
    /// Dropped by the gateway after acceptance
    Failed,
}

/// Abstraction over payment processors.
///
/// The engine only ever asks for refunds; charging happens in the purchase
/// flow, outside this crate.
pub trait PaymentGateway: Send + Sync {
    /// Asks the gateway to refund `amount` against the original payment.
    /// Resolves to the gateway's refund reference.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the gateway refuses or cannot be
    /// reached.
    fn issue_refund(
        &self,
        payment_reference: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>>;

    /// Polls the gateway for the standing of a previously issued refund.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the gateway cannot be reached.
    fn refund_status(
        &self,
        refund_reference: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<GatewayRefundStatus>> + Send>>;
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification delivery failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// A message worth telling the holder about
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// Seats confirmed, ticket attached
    BookingConfirmed {
        /// Who to tell
        user_id: UserId,
        /// Human-readable event name
        event_name: String,
        /// The confirmed booking
        booking_id: BookingId,
        /// The ticket token on the proof of purchase
        ticket_id: TicketId,
        /// What was charged
        total_amount: Money,
    },
    /// Booking cancelled, refund standing attached
    BookingCancelled {
        /// Who to tell
        user_id: UserId,
        /// Human-readable event name
        event_name: String,
        /// The cancelled booking
        booking_id: BookingId,
        /// What comes back
        refund_amount: Money,
        /// Where the refund stands
        refund_status: RefundStatus,
    },
}

/// Fire-and-forget notification delivery.
///
/// Callers spawn deliveries off the request path; a failure here never fails
/// the operation that triggered it.
pub trait Notifier: Send + Sync {
    /// Delivers one notice.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails; callers log and move on.
    fn notify(
        &self,
        notice: Notice,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}

// ============================================================================
// Clock
// ============================================================================

/// Source of the current time, injectable for tests
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Creates a new `SystemClock`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<dyn Clock> {
        Arc::new(Self::new())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
