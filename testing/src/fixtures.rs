//! Builders for domain fixtures.
//!
//! Dates are placed relative to [`test_clock`](crate::mocks::test_clock) so
//! refund tiers and the open-for-sale check come out exact.

use chrono::Duration;
use stagepass_core::refund::RefundPolicy;
use stagepass_core::types::{
    Capacity, EventId, EventSnapshot, Money, SeatPlan, TicketCategory, UserId,
};

use crate::mocks::test_now;

/// Builds [`EventSnapshot`]s for tests.
///
/// Defaults to an open flat-plan event 30 days past [`test_now`] with 100
/// seats at $25.
#[derive(Clone, Debug)]
pub struct EventBuilder {
    name: String,
    start_in: Duration,
    cancelled: bool,
    organizer_id: Option<UserId>,
    seat_plan: SeatPlan,
    refund_policy: Option<RefundPolicy>,
}

impl EventBuilder {
    /// Create a builder with the defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "Summer Concert".to_string(),
            start_in: Duration::days(30),
            cancelled: false,
            organizer_id: None,
            seat_plan: SeatPlan::Flat {
                price: Money::from_cents(2500),
                capacity: Capacity::new(100),
            },
            refund_policy: None,
        }
    }

    /// Set the event name
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Place the event this many whole days after the test clock
    #[must_use]
    pub fn days_until(mut self, days: i64) -> Self {
        self.start_in = Duration::days(days);
        self
    }

    /// Place the event this far after the test clock
    #[must_use]
    pub fn starting_in(mut self, offset: Duration) -> Self {
        self.start_in = offset;
        self
    }

    /// Mark the event cancelled
    #[must_use]
    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }

    /// Set the organizer who owns the event
    #[must_use]
    pub fn organizer(mut self, organizer_id: UserId) -> Self {
        self.organizer_id = Some(organizer_id);
        self
    }

    /// Sell a single flat pool at the given price and size
    #[must_use]
    pub fn flat(mut self, price_cents: u64, capacity: u32) -> Self {
        self.seat_plan = SeatPlan::Flat {
            price: Money::from_cents(price_cents),
            capacity: Capacity::new(capacity),
        };
        self
    }

    /// Sell named categories, each as (name, price cents, capacity)
    #[must_use]
    pub fn categories(mut self, specs: &[(&str, u64, u32)]) -> Self {
        self.seat_plan = SeatPlan::Categorized {
            categories: specs
                .iter()
                .map(|(name, price_cents, capacity)| TicketCategory {
                    name: (*name).to_string(),
                    price: Money::from_cents(*price_cents),
                    capacity: Capacity::new(*capacity),
                })
                .collect(),
        };
        self
    }

    /// Override the default refund percentages
    #[must_use]
    pub fn refund_policy(mut self, policy: RefundPolicy) -> Self {
        self.refund_policy = Some(policy);
        self
    }

    /// Build the snapshot, minting fresh ids where none were given
    #[must_use]
    pub fn build(self) -> EventSnapshot {
        EventSnapshot {
            id: EventId::new(),
            name: self.name,
            date: test_now() + self.start_in,
            cancelled: self.cancelled,
            organizer_id: self.organizer_id.unwrap_or_default(),
            seat_plan: self.seat_plan,
            refund_policy: self.refund_policy,
        }
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}
