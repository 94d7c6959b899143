//! Inventory ledger.
//!
//! Booked and available counts are derived from the set of active bookings
//! every time they are needed; nothing here is stored or cached. Each
//! booking is attributed by its own line shape, not by the event's current
//! plan, so bookings sold under an older plan keep consuming capacity and
//! show up as `unattributed` when they no longer map onto a current pool.
//!
//! [`ensure_fit`] is the commit-time guard: store implementations call it
//! inside their critical section so that the capacity invariant holds under
//! concurrent writers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConflictKind;
use crate::types::{Booking, BookingLines, EventId, SeatPlan};

/// Derived availability of one pool of seats
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAvailability {
    /// Category name, `None` for a flat pool
    pub category: Option<String>,
    /// Seats the pool was created with
    pub capacity: u32,
    /// Seats held by active bookings
    pub reserved: u32,
    /// Seats still on sale
    pub available: u32,
}

/// Derived availability for a whole event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    /// The event the report describes
    pub event_id: EventId,
    /// One row per pool of the event's current plan
    pub pools: Vec<PoolAvailability>,
    /// Seats held by active bookings whose shape no longer matches the
    /// current plan, e.g. flat bookings left over after a switch to
    /// categories
    pub unattributed: u32,
}

impl AvailabilityReport {
    /// Looks up one pool's row.
    #[must_use]
    pub fn pool(&self, category: Option<&str>) -> Option<&PoolAvailability> {
        self.pools.iter().find(|p| p.category.as_deref() == category)
    }

    /// Seats held by active bookings across all pools, attributed or not.
    #[must_use]
    pub fn total_reserved(&self) -> u32 {
        self.pools.iter().map(|p| p.reserved).sum::<u32>() + self.unattributed
    }
}

/// Computes per-pool availability from the active subset of `bookings`.
#[must_use]
pub fn compute_availability(
    event_id: EventId,
    plan: &SeatPlan,
    bookings: &[Booking],
) -> AvailabilityReport {
    let active: Vec<&Booking> = bookings.iter().filter(|b| b.is_active()).collect();

    match plan {
        SeatPlan::Flat { capacity, .. } => {
            let reserved: u32 = active.iter().map(|b| b.total_quantity).sum();
            AvailabilityReport {
                event_id,
                pools: vec![PoolAvailability {
                    category: None,
                    capacity: capacity.value(),
                    reserved,
                    available: capacity.value().saturating_sub(reserved),
                }],
                unattributed: 0,
            }
        }
        SeatPlan::Categorized { categories } => {
            let mut reserved_by_name: HashMap<&str, u32> = categories
                .iter()
                .map(|c| (c.name.as_str(), 0_u32))
                .collect();
            let mut unattributed = 0_u32;

            for booking in &active {
                match &booking.lines {
                    BookingLines::Flat { quantity, .. } => unattributed += quantity,
                    BookingLines::Categorized { items } => {
                        for item in items {
                            match reserved_by_name.get_mut(item.category.as_str()) {
                                Some(count) => *count += item.quantity,
                                None => unattributed += item.quantity,
                            }
                        }
                    }
                }
            }

            let pools = categories
                .iter()
                .map(|c| {
                    let reserved = reserved_by_name.get(c.name.as_str()).copied().unwrap_or(0);
                    PoolAvailability {
                        category: Some(c.name.clone()),
                        capacity: c.capacity.value(),
                        reserved,
                        available: c.capacity.value().saturating_sub(reserved),
                    }
                })
                .collect();

            AvailabilityReport {
                event_id,
                pools,
                unattributed,
            }
        }
    }
}

/// Validates that `candidate` still fits the plan given the bookings
/// already committed.
///
/// Store implementations call this inside their critical section; the
/// answer is only authoritative while that section holds.
///
/// # Errors
///
/// Returns [`ConflictKind::InventoryExceeded`] naming a pool that
/// overflows. A candidate whose shape does not match the current plan
/// (a flat request against categories, or a category that vanished) is
/// reported as an overflow of a pool with zero seats.
pub fn ensure_fit(
    plan: &SeatPlan,
    existing: &[Booking],
    candidate: &BookingLines,
) -> Result<(), ConflictKind> {
    let report = compute_availability(EventId::default(), plan, existing);

    match candidate {
        BookingLines::Flat { quantity, .. } => {
            let available = report.pool(None).map_or(0, |p| p.available);
            if *quantity > available {
                return Err(ConflictKind::InventoryExceeded {
                    category: None,
                    requested: *quantity,
                    available,
                });
            }
        }
        BookingLines::Categorized { items } => {
            let mut requested_by_name: HashMap<&str, u32> = HashMap::new();
            for item in items {
                *requested_by_name.entry(item.category.as_str()).or_default() += item.quantity;
            }
            for (name, requested) in requested_by_name {
                let available = report.pool(Some(name)).map_or(0, |p| p.available);
                if requested > available {
                    return Err(ConflictKind::InventoryExceeded {
                        category: Some(name.to_string()),
                        requested,
                        available,
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Booking, Capacity, LineItem, Money, TicketCategory, TicketId, UserId};
    use chrono::{TimeZone, Utc};

    fn flat_plan(capacity: u32) -> SeatPlan {
        SeatPlan::Flat {
            price: Money::from_cents(2500),
            capacity: Capacity::new(capacity),
        }
    }

    fn two_tier_plan() -> SeatPlan {
        SeatPlan::Categorized {
            categories: vec![
                TicketCategory::new("vip".to_string(), Money::from_cents(9000), Capacity::new(4)),
                TicketCategory::new(
                    "general".to_string(),
                    Money::from_cents(3000),
                    Capacity::new(50),
                ),
            ],
        }
    }

    fn booking(event_id: EventId, lines: BookingLines, cancelled: bool) -> Booking {
        let mut b = Booking::new(
            event_id,
            UserId::new(),
            lines,
            TicketId::from_token(format!("tok-{}", UserId::new())),
            String::new(),
            None,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
        .unwrap();
        b.cancelled_by_user = cancelled;
        b
    }

    fn flat_lines(quantity: u32) -> BookingLines {
        BookingLines::Flat {
            quantity,
            unit_price: Money::from_cents(2500),
        }
    }

    fn vip_lines(quantity: u32) -> BookingLines {
        BookingLines::Categorized {
            items: vec![
                LineItem::new("vip".to_string(), quantity, Money::from_cents(9000)).unwrap(),
            ],
        }
    }

    #[test]
    fn flat_pool_counts_only_active_bookings() {
        let event_id = EventId::new();
        let bookings = vec![
            booking(event_id, flat_lines(3), false),
            booking(event_id, flat_lines(2), true),
            booking(event_id, flat_lines(4), false),
        ];
        let report = compute_availability(event_id, &flat_plan(10), &bookings);
        let pool = report.pool(None).unwrap();
        assert_eq!(pool.reserved, 7);
        assert_eq!(pool.available, 3);
        assert_eq!(report.unattributed, 0);
    }

    #[test]
    fn flat_pool_absorbs_historical_categorized_bookings() {
        let event_id = EventId::new();
        let bookings = vec![
            booking(event_id, flat_lines(3), false),
            booking(event_id, vip_lines(2), false),
        ];
        let report = compute_availability(event_id, &flat_plan(10), &bookings);
        let pool = report.pool(None).unwrap();
        assert_eq!(pool.reserved, 5);
        assert_eq!(report.unattributed, 0);
    }

    #[test]
    fn categories_are_summed_independently() {
        let event_id = EventId::new();
        let bookings = vec![
            booking(event_id, vip_lines(2), false),
            booking(event_id, vip_lines(1), true),
            booking(
                event_id,
                BookingLines::Categorized {
                    items: vec![
                        LineItem::new("general".to_string(), 5, Money::from_cents(3000)).unwrap(),
                    ],
                },
                false,
            ),
        ];
        let report = compute_availability(event_id, &two_tier_plan(), &bookings);
        assert_eq!(report.pool(Some("vip")).unwrap().reserved, 2);
        assert_eq!(report.pool(Some("vip")).unwrap().available, 2);
        assert_eq!(report.pool(Some("general")).unwrap().reserved, 5);
        assert_eq!(report.pool(Some("general")).unwrap().available, 45);
    }

    #[test]
    fn bookings_outside_the_current_plan_are_reported_unattributed() {
        let event_id = EventId::new();
        let bookings = vec![
            booking(event_id, flat_lines(4), false),
            booking(
                event_id,
                BookingLines::Categorized {
                    items: vec![
                        LineItem::new("balcony".to_string(), 2, Money::from_cents(1500)).unwrap(),
                    ],
                },
                false,
            ),
        ];
        let report = compute_availability(event_id, &two_tier_plan(), &bookings);
        assert_eq!(report.unattributed, 6);
        assert_eq!(report.total_reserved(), 6);
    }

    #[test]
    fn available_never_goes_negative() {
        let event_id = EventId::new();
        let bookings = vec![booking(event_id, flat_lines(8), false)];
        let report = compute_availability(event_id, &flat_plan(5), &bookings);
        assert_eq!(report.pool(None).unwrap().available, 0);
        assert_eq!(report.pool(None).unwrap().reserved, 8);
    }

    #[test]
    fn a_request_that_exactly_fills_the_pool_fits() {
        let event_id = EventId::new();
        let existing = vec![booking(event_id, flat_lines(7), false)];
        assert!(ensure_fit(&flat_plan(10), &existing, &flat_lines(3)).is_ok());
    }

    #[test]
    fn one_seat_past_the_boundary_is_rejected_with_counts() {
        let event_id = EventId::new();
        let existing = vec![booking(event_id, flat_lines(7), false)];
        let err = ensure_fit(&flat_plan(10), &existing, &flat_lines(4)).unwrap_err();
        assert_eq!(
            err,
            ConflictKind::InventoryExceeded {
                category: None,
                requested: 4,
                available: 3,
            }
        );
    }

    #[test]
    fn category_overflow_names_the_category() {
        let event_id = EventId::new();
        let existing = vec![booking(event_id, vip_lines(3), false)];
        let err = ensure_fit(&two_tier_plan(), &existing, &vip_lines(2)).unwrap_err();
        assert_eq!(
            err,
            ConflictKind::InventoryExceeded {
                category: Some("vip".to_string()),
                requested: 2,
                available: 1,
            }
        );
    }

    #[test]
    fn a_flat_request_against_a_categorized_plan_is_an_overflow() {
        let err = ensure_fit(&two_tier_plan(), &[], &flat_lines(1)).unwrap_err();
        assert!(matches!(
            err,
            ConflictKind::InventoryExceeded { available: 0, .. }
        ));
    }

    #[test]
    fn cancelled_seats_are_resellable() {
        let event_id = EventId::new();
        let existing = vec![
            booking(event_id, flat_lines(10), true),
            booking(event_id, flat_lines(6), false),
        ];
        assert!(ensure_fit(&flat_plan(10), &existing, &flat_lines(4)).is_ok());
    }
}
