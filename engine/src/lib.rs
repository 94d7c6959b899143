//! Stagepass Engine: the application services over the domain core.
//!
//! Each service owns one workflow and runs it against an [`Environment`] of
//! shared ports, so the same service code drives the in-memory doubles in
//! tests and Postgres in production:
//!
//! - [`ReservationCoordinator`] validates, prices, and commits reservations
//! - [`VerificationGate`] admits scanned proofs exactly once
//! - [`CancellationWorkflow`] cancels bookings and settles refunds
//! - [`AvailabilityService`] derives remaining seats on demand
//!
//! Services hold no state of their own. Everything racy lives behind the
//! store port, which is why the services can stay plain async functions
//! over cloned [`Environment`] handles.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod cancellation;
pub mod environment;
pub mod reservation;
pub mod verification;

pub use availability::AvailabilityService;
pub use cancellation::{CancellationWorkflow, RefundStatusReport};
pub use environment::Environment;
pub use reservation::{
    CategorySelection, ReservationConfirmation, ReservationCoordinator, ReservationRequest,
    SeatSelection,
};
pub use verification::VerificationGate;
