//! Domain types for the Stagepass reservation engine.
//!
//! This module contains the value objects and entities shared by every other
//! layer: identifiers, money, seat plans, bookings, and the read models
//! returned by the engine's operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::refund::{RefundPolicy, RefundQuote};

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BookingId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque ticket token printed on a proof of purchase.
///
/// Unlike the UUID-backed identifiers above, a ticket id is a random text
/// token with at least 128 bits of entropy. Tokens are drawn by
/// [`crate::ticket::TicketIssuer`]; uniqueness is ultimately enforced by the
/// booking store, never by the drawing side.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(String);

impl TicketId {
    /// Wraps an already-issued token.
    #[must_use]
    pub const fn from_token(token: String) -> Self {
        Self(token)
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the token text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money
// ============================================================================

/// An amount of money in integer cents.
///
/// Seat prices and refunds never need fractions of a cent, so arithmetic
/// stays in `u64` and every operation that could overflow is checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Wraps an amount given in cents.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The amount in cents.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// The amount in whole dollars, truncated.
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition; `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(total) => Some(Self(total)),
            None => None,
        }
    }

    /// Checked subtraction; `None` when the result would go negative.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// A price times a seat count; `None` on overflow.
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(total) => Some(Self(total)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Capacity and Seat Plans
// ============================================================================

/// Maximum number of seats a single booking line may request
pub const MAX_LINE_QUANTITY: u32 = 10;

/// Maximum number of named ticket categories per event
pub const MAX_TICKET_CATEGORIES: usize = 5;

/// Represents capacity for an event or a ticket category
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(pub u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named ticket category within a categorized seat plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCategory {
    /// Category name (e.g., "VIP", "General", "Balcony")
    pub name: String,
    /// Price per seat in this category
    pub price: Money,
    /// Seats available in this category
    pub capacity: Capacity,
}

impl TicketCategory {
    /// Creates a new `TicketCategory`
    #[must_use]
    pub const fn new(name: String, price: Money, capacity: Capacity) -> Self {
        Self {
            name,
            price,
            capacity,
        }
    }
}

/// How an event sells its capacity.
///
/// Exactly one mode is active per event. Bookings remember the mode they were
/// created under, so a plan change never rewrites history; the inventory
/// ledger reads each booking's own shape when attributing seats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeatPlan {
    /// A single undifferentiated pool of seats
    Flat {
        /// Price per seat
        price: Money,
        /// Total seats in the pool
        capacity: Capacity,
    },
    /// One to five named categories, each with its own price and pool
    Categorized {
        /// The categories on sale
        categories: Vec<TicketCategory>,
    },
}

impl SeatPlan {
    /// Looks up a category by name. Returns `None` for flat plans.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&TicketCategory> {
        match self {
            Self::Flat { .. } => None,
            Self::Categorized { categories } => categories.iter().find(|c| c.name == name),
        }
    }

    /// Total seats across every pool of the plan.
    #[must_use]
    pub fn total_capacity(&self) -> u32 {
        match self {
            Self::Flat { capacity, .. } => capacity.value(),
            Self::Categorized { categories } => {
                categories.iter().map(|c| c.capacity.value()).sum()
            }
        }
    }
}

// ============================================================================
// Users and Event Snapshots
// ============================================================================

/// Authorization role reported by the user directory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Regular attendee
    Attendee,
    /// Event organizer
    Organizer,
    /// Platform administrator
    Admin,
}

impl Role {
    /// Returns the canonical lowercase name for this role
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attendee => "attendee",
            Self::Organizer => "organizer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendee" => Ok(Self::Attendee),
            "organizer" => Ok(Self::Organizer),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Point-in-time view of an event as reported by the event catalog.
///
/// The engine never mutates events; it only reads this snapshot to validate
/// reservations and price cancellations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Unique event identifier
    pub id: EventId,
    /// Event name
    pub name: String,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Whether the organizer has cancelled the event
    pub cancelled: bool,
    /// The organizer who owns the event
    pub organizer_id: UserId,
    /// How the event sells its capacity
    pub seat_plan: SeatPlan,
    /// Organizer-chosen refund tiers, if any
    pub refund_policy: Option<RefundPolicy>,
}

impl EventSnapshot {
    /// Whether the event can still accept reservations at `now`.
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        !self.cancelled && self.date > now
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// The seats a booking holds, in the shape the event sold them.
///
/// A booking created under a flat plan stays `Flat` forever, even if the
/// event later switches to categories; the ledger reads this tag rather than
/// the event's current mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingLines {
    /// Seats from a single flat pool
    Flat {
        /// Number of seats
        quantity: u32,
        /// Price per seat captured at reservation time; never recomputed
        unit_price: Money,
    },
    /// Seats from one or more named categories
    Categorized {
        /// One entry per requested category
        items: Vec<LineItem>,
    },
}

impl BookingLines {
    /// Total number of seats across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        match self {
            Self::Flat { quantity, .. } => *quantity,
            Self::Categorized { items } => items.iter().map(|i| i.quantity).sum(),
        }
    }

    /// Total amount across all lines, `None` on arithmetic overflow.
    #[must_use]
    pub fn total_amount(&self) -> Option<Money> {
        match self {
            Self::Flat {
                quantity,
                unit_price,
            } => unit_price.checked_multiply(*quantity),
            Self::Categorized { items } => items
                .iter()
                .try_fold(Money::from_cents(0), |acc, item| {
                    acc.checked_add(item.subtotal)
                }),
        }
    }
}

/// One category's worth of seats inside a categorized booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Category name as it existed at reservation time
    pub category: String,
    /// Number of seats in this category
    pub quantity: u32,
    /// Price per seat captured at reservation time; never recomputed
    pub unit_price: Money,
    /// `unit_price * quantity`, fixed at reservation time
    pub subtotal: Money,
}

impl LineItem {
    /// Builds a line item, computing its subtotal.
    ///
    /// Returns `None` if the subtotal would overflow.
    #[must_use]
    pub fn new(category: String, quantity: u32, unit_price: Money) -> Option<Self> {
        let subtotal = unit_price.checked_multiply(quantity)?;
        Some(Self {
            category,
            quantity,
            unit_price,
            subtotal,
        })
    }
}

/// Where a refund stands for a cancelled booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundStatus {
    /// No refund is owed
    None,
    /// A refund is owed and awaits processing
    Pending,
    /// The gateway confirmed the refund
    Processed,
    /// The gateway rejected or dropped the refund; needs manual review
    Failed,
}

impl RefundStatus {
    /// Returns the canonical lowercase name for this status
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefundStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown refund status: {other}")),
        }
    }
}

/// A confirmed reservation.
///
/// Bookings are never deleted. Cancellation flips flags and the inventory
/// ledger stops counting the seats; the row stays for audit and refunds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// Event the seats belong to
    pub event_id: EventId,
    /// User who holds the booking
    pub user_id: UserId,
    /// The seats, in the shape they were sold
    pub lines: BookingLines,
    /// Total seats across all lines
    pub total_quantity: u32,
    /// Total charged amount, fixed at reservation time
    pub total_amount: Money,
    /// Globally unique ticket token
    pub ticket_id: TicketId,
    /// Encoded proof-of-purchase payload
    pub proof_payload: String,
    /// Gateway reference from the purchase, used to route refunds
    pub payment_reference: Option<String>,
    /// Whether the ticket has been scanned at the gate (one-way)
    pub verified: bool,
    /// When the gate scan happened
    pub verified_at: Option<DateTime<Utc>>,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
    /// Set when the holder cancelled the booking
    pub cancelled_by_user: bool,
    /// Set when the whole event was cancelled
    pub cancelled_by_event: bool,
    /// When the cancellation happened
    pub cancellation_date: Option<DateTime<Utc>>,
    /// Free-text reason recorded at cancellation
    pub cancellation_reason: Option<String>,
    /// Where the refund stands
    pub refund_status: RefundStatus,
    /// Refund amount owed or paid
    pub refund_amount: Option<Money>,
    /// Gateway reference for the refund, once issued
    pub refund_reference: Option<String>,
}

impl Booking {
    /// Builds a fresh, unverified, active booking with derived totals.
    ///
    /// Returns `None` if the total amount would overflow.
    #[must_use]
    pub fn new(
        event_id: EventId,
        user_id: UserId,
        lines: BookingLines,
        ticket_id: TicketId,
        proof_payload: String,
        payment_reference: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        let total_quantity = lines.total_quantity();
        let total_amount = lines.total_amount()?;
        Some(Self {
            id: BookingId::new(),
            event_id,
            user_id,
            lines,
            total_quantity,
            total_amount,
            ticket_id,
            proof_payload,
            payment_reference,
            verified: false,
            verified_at: None,
            created_at,
            cancelled_by_user: false,
            cancelled_by_event: false,
            cancellation_date: None,
            cancellation_reason: None,
            refund_status: RefundStatus::None,
            refund_amount: None,
            refund_reference: None,
        })
    }

    /// Whether the booking still holds its seats.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.cancelled_by_user && !self.cancelled_by_event
    }

    /// Whether the booking has been cancelled by anyone.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled_by_user || self.cancelled_by_event
    }
}

// ============================================================================
// Operation Results
// ============================================================================

/// What a gate operator sees after a successful scan
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    /// The verified booking
    pub booking_id: BookingId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Ticket holder
    pub user_id: UserId,
    /// Seats being admitted
    pub lines: BookingLines,
    /// Total seats being admitted
    pub total_quantity: u32,
    /// When this scan verified the ticket
    pub verified_at: DateTime<Utc>,
}

/// Result of a self-service cancellation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancellationOutcome {
    /// The cancelled booking
    pub booking_id: BookingId,
    /// When the cancellation took effect
    pub cancelled_at: DateTime<Utc>,
    /// The refund computation that applied
    pub quote: RefundQuote,
    /// Where the refund stands after the attempt
    pub refund_status: RefundStatus,
    /// Gateway reference for the refund, if one was issued
    pub refund_reference: Option<String>,
}

/// Result of cancelling every active booking of an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCancellationOutcome {
    /// The cancelled event
    pub event_id: EventId,
    /// How many active bookings were marked for deferred refunds
    pub bookings_cancelled: u64,
}
