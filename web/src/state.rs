//! Application state for the StagePass HTTP server.

use stagepass_engine::{
    AvailabilityService, CancellationWorkflow, Environment, ReservationCoordinator,
    VerificationGate,
};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Holds one instance of each workflow, all wired onto the same
/// [`Environment`]. It's cloned (cheaply via `Arc`) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Reservation workflow (validation, pricing, ticket issuance, commit)
    pub reservations: Arc<ReservationCoordinator>,
    /// Cancellation and refund workflow
    pub cancellations: Arc<CancellationWorkflow>,
    /// Gate-side proof verification
    pub verification: Arc<VerificationGate>,
    /// Availability queries derived from active bookings
    pub availability: Arc<AvailabilityService>,
}

impl AppState {
    /// Wires every workflow onto one set of collaborators.
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self {
            reservations: Arc::new(ReservationCoordinator::new(env.clone())),
            cancellations: Arc::new(CancellationWorkflow::new(env.clone())),
            verification: Arc::new(VerificationGate::new(env.clone())),
            availability: Arc::new(AvailabilityService::new(env)),
        }
    }
}
