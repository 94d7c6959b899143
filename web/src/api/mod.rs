//! API endpoints for the reservation engine.
//!
//! Handlers are organized by resource:
//! - Reservations: reserving seats and issuing tickets
//! - Bookings: self-service reads, cancellation, refund quotes and status
//! - Tickets: gate-side proof verification
//! - Events: availability queries and bulk cancellation
//! - Health: liveness probe

pub mod bookings;
pub mod events;
pub mod health;
pub mod reservations;
pub mod tickets;

pub use bookings::{cancel_booking, get_booking, get_refund_quote, get_refund_status};
pub use events::{cancel_event_bookings, get_event_availability};
pub use health::health_check;
pub use reservations::create_reservation;
pub use tickets::verify_ticket;
