//! Seat availability reporting.

use stagepass_core::error::CoreError;
use stagepass_core::ledger::{AvailabilityReport, compute_availability};
use stagepass_core::types::EventId;

use crate::environment::Environment;

/// Answers how many seats an event still has
#[derive(Clone)]
pub struct AvailabilityService {
    env: Environment,
}

impl AvailabilityService {
    /// Creates a service over the given environment.
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Reports the event's remaining seats, pool by pool.
    ///
    /// Nothing is stored for this; the report is derived on the spot from
    /// the event's current plan and its active bookings, so cancelled
    /// bookings are already back in the count.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown event.
    pub async fn availability(&self, event_id: EventId) -> Result<AvailabilityReport, CoreError> {
        let event = self
            .env
            .catalog()
            .event_by_id(event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", event_id))?;

        let bookings = self.env.store().active_bookings_for_event(event_id).await?;
        Ok(compute_availability(event_id, &event.seat_plan, &bookings))
    }
}
