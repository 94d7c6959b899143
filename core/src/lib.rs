//! Stagepass Core - domain model of the ticket inventory and reservation
//! engine.
//!
//! This crate holds everything that can be computed without I/O, plus the
//! contracts the imperative shell implements:
//!
//! - **Types**: identifiers, money, seat plans, bookings
//! - **Inventory ledger**: availability derived from active bookings
//! - **Refund engine**: pure time-tiered refund pricing
//! - **Ticket issuer**: high-entropy opaque ticket tokens
//! - **Proof codec**: scannable payload binding a ticket to its event
//! - **Ports**: traits for the store, catalog, directory, gateway, notifier
//!
//! # Architecture
//!
//! ```text
//!                ┌─────────────────────────────────────────┐
//!                │            stagepass-engine             │
//!                │  reservation / verification / refunds   │
//!                └───────┬─────────────────────┬───────────┘
//!                        │ pure calls          │ Arc<dyn Trait>
//!                        ▼                     ▼
//!     ┌──────────────────────────┐   ┌──────────────────────────┐
//!     │      stagepass-core      │   │   port implementations   │
//!     │ ledger · refund · proof  │   │  Postgres store, catalog │
//!     │ ticket · types · errors  │   │  gateway, notifier, ...  │
//!     └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! Handlers are short-lived and share no process state; the booking store is
//! the only coordination point. The port contracts in [`ports`] spell out
//! which writes must be atomic so that capacity, ticket uniqueness, and
//! one-shot verification hold under concurrency.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ledger;
pub mod ports;
pub mod proof;
pub mod refund;
pub mod ticket;
pub mod types;

pub use error::{ConflictKind, CoreError};
pub use ledger::{AvailabilityReport, PoolAvailability, compute_availability, ensure_fit};
pub use ports::{
    BookingStore, CancellationUpdate, Clock, EventCatalog, GatewayError, GatewayRefundStatus,
    GatewayResult, Notice, Notifier, NotifyError, PaymentGateway, StoreError, SystemClock,
    UserDirectory,
};
pub use proof::ProofPayload;
pub use refund::{RefundPolicy, RefundQuote, RefundTier, calculate_refund};
pub use ticket::TicketIssuer;
pub use types::{
    Booking, BookingId, BookingLines, BookingSummary, CancellationOutcome, Capacity, EventId,
    EventCancellationOutcome, EventSnapshot, LineItem, MAX_LINE_QUANTITY, MAX_TICKET_CATEGORIES,
    Money, RefundStatus, Role, SeatPlan, TicketCategory, TicketId, UserId,
};
