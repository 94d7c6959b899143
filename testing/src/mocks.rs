//! In-memory doubles for the engine's ports
//!
//! Each double keeps its state behind a single lock, so the guarded store
//! operations are as atomic here as in Postgres and the services exercise
//! the same conflict paths in tests:
//! - [`InMemoryBookingStore`]: bookings with the guarded insert and flips
//! - [`InMemoryEventCatalog`], [`InMemoryUserDirectory`]: keyed lookups
//! - [`RecordingGateway`], [`RecordingNotifier`]: side-effect recorders
//! - [`FixedClock`]: deterministic time

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning is fatal in tests anyway

use chrono::{DateTime, TimeZone, Utc};
use stagepass_core::error::ConflictKind;
use stagepass_core::ledger::ensure_fit;
use stagepass_core::ports::{
    BookingStore, CancellationUpdate, Clock, EventCatalog, GatewayError, GatewayRefundStatus,
    GatewayResult, Notice, Notifier, NotifyError, PaymentGateway, StoreError, UserDirectory,
};
use stagepass_core::types::{
    Booking, BookingId, EventId, EventSnapshot, Money, RefundStatus, Role, SeatPlan, TicketId,
    UserId,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

/// In-memory booking store for fast, deterministic testing.
///
/// One `RwLock` over the whole map makes every write a single critical
/// section, which is exactly the atomicity the port asks of a real store:
/// the capacity check, the duplicate check, and the ticket-id check all
/// happen under the same lock as the insert.
#[derive(Clone, Debug)]
pub struct InMemoryBookingStore {
    bookings: Arc<RwLock<HashMap<BookingId, Booking>>>,
}

impl InMemoryBookingStore {
    /// Create a new empty in-memory booking store
    #[must_use]
    pub fn new() -> Self {
        Self {
            bookings: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get a booking snapshot by id
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.bookings.read().unwrap().get(&id).cloned()
    }

    /// Get all stored bookings, in no particular order
    #[must_use]
    pub fn all(&self) -> Vec<Booking> {
        self.bookings.read().unwrap().values().cloned().collect()
    }

    /// Get the number of stored bookings
    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookings.read().unwrap().is_empty()
    }

    /// Mark a booking cancelled-by-user directly, bypassing the workflow.
    ///
    /// For arranging test state; refund fields are left untouched.
    pub fn force_cancel(&self, id: BookingId) {
        if let Some(booking) = self.bookings.write().unwrap().get_mut(&id) {
            booking.cancelled_by_user = true;
            booking.cancellation_date = Some(Utc::now());
        }
    }

    /// Overwrite a booking's refund fields directly, bypassing the workflow.
    pub fn set_refund(
        &self,
        id: BookingId,
        status: RefundStatus,
        amount: Option<Money>,
        reference: Option<String>,
    ) {
        if let Some(booking) = self.bookings.write().unwrap().get_mut(&id) {
            booking.refund_status = status;
            booking.refund_amount = amount;
            booking.refund_reference = reference;
        }
    }
}

impl Default for InMemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore for InMemoryBookingStore {
    fn insert_booking<'a>(
        &'a self,
        booking: &'a Booking,
        plan: &'a SeatPlan,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut bookings = self.bookings.write().unwrap();
            if bookings.values().any(|b| b.ticket_id == booking.ticket_id) {
                return Err(StoreError::TicketIdTaken);
            }
            if bookings.values().any(|b| {
                b.event_id == booking.event_id && b.user_id == booking.user_id && b.is_active()
            }) {
                return Err(ConflictKind::DuplicateReservation.into());
            }
            let existing: Vec<Booking> = bookings
                .values()
                .filter(|b| b.event_id == booking.event_id)
                .cloned()
                .collect();
            ensure_fit(plan, &existing, &booking.lines)?;
            bookings.insert(booking.id, booking.clone());
            Ok(())
        })
    }

    fn ticket_id_exists<'a>(
        &'a self,
        ticket_id: &'a TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .bookings
                .read()
                .unwrap()
                .values()
                .any(|b| b.ticket_id == *ticket_id))
        })
    }

    fn booking_by_id(
        &self,
        id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.bookings.read().unwrap().get(&id).cloned()) })
    }

    fn booking_by_ticket<'a>(
        &'a self,
        ticket_id: &'a TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .bookings
                .read()
                .unwrap()
                .values()
                .find(|b| b.ticket_id == *ticket_id)
                .cloned())
        })
    }

    fn has_active_booking(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + '_>> {
        Box::pin(async move {
            Ok(self.bookings.read().unwrap().values().any(|b| {
                b.event_id == event_id && b.user_id == user_id && b.is_active()
            }))
        })
    }

    fn active_bookings_for_event(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            Ok(self
                .bookings
                .read()
                .unwrap()
                .values()
                .filter(|b| b.event_id == event_id && b.is_active())
                .cloned()
                .collect())
        })
    }

    fn mark_verified<'a>(
        &'a self,
        ticket_id: &'a TicketId,
        verified_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut bookings = self.bookings.write().unwrap();
            let booking = bookings
                .values_mut()
                .find(|b| b.ticket_id == *ticket_id)
                .ok_or_else(|| StoreError::BookingNotFound(ticket_id.to_string()))?;
            if booking.is_cancelled() {
                return Err(ConflictKind::AlreadyCancelled.into());
            }
            if booking.verified {
                return Err(ConflictKind::TicketAlreadyUsed.into());
            }
            booking.verified = true;
            booking.verified_at = Some(verified_at);
            Ok(booking.clone())
        })
    }

    fn cancel_booking(
        &self,
        id: BookingId,
        update: CancellationUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut bookings = self.bookings.write().unwrap();
            let booking = bookings
                .get_mut(&id)
                .ok_or_else(|| StoreError::BookingNotFound(id.to_string()))?;
            if booking.is_cancelled() {
                return Err(ConflictKind::AlreadyCancelled.into());
            }
            booking.cancelled_by_user = true;
            booking.cancellation_date = Some(update.cancelled_at);
            booking.cancellation_reason = update.reason;
            booking.refund_status = update.refund_status;
            booking.refund_amount = Some(update.refund_amount);
            Ok(booking.clone())
        })
    }

    fn record_refund_outcome(
        &self,
        id: BookingId,
        status: RefundStatus,
        reference: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut bookings = self.bookings.write().unwrap();
            let booking = bookings
                .get_mut(&id)
                .ok_or_else(|| StoreError::BookingNotFound(id.to_string()))?;
            booking.refund_status = status;
            booking.refund_reference = reference;
            Ok(())
        })
    }

    fn cancel_event_bookings(
        &self,
        event_id: EventId,
        cancelled_at: DateTime<Utc>,
        reason: String,
    ) -> Pin<Box<dyn Future<Output = Result<u64, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut bookings = self.bookings.write().unwrap();
            let mut touched = 0u64;
            for booking in bookings.values_mut() {
                if booking.event_id == event_id && booking.is_active() {
                    booking.cancelled_by_event = true;
                    booking.cancellation_date = Some(cancelled_at);
                    booking.cancellation_reason = Some(reason.clone());
                    booking.refund_status = RefundStatus::Pending;
                    booking.refund_amount = Some(booking.total_amount);
                    touched += 1;
                }
            }
            Ok(touched)
        })
    }
}

/// In-memory event catalog keyed by event id
#[derive(Clone, Debug)]
pub struct InMemoryEventCatalog {
    events: Arc<RwLock<HashMap<EventId, EventSnapshot>>>,
}

impl InMemoryEventCatalog {
    /// Create a new empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add or replace an event
    pub fn put(&self, event: EventSnapshot) {
        self.events.write().unwrap().insert(event.id, event);
    }

    /// Mark an event cancelled in place
    pub fn cancel_event(&self, id: EventId) {
        if let Some(event) = self.events.write().unwrap().get_mut(&id) {
            event.cancelled = true;
        }
    }
}

impl Default for InMemoryEventCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventCatalog for InMemoryEventCatalog {
    fn event_by_id(
        &self,
        id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventSnapshot>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.events.read().unwrap().get(&id).cloned()) })
    }
}

/// In-memory user directory keyed by user id
#[derive(Clone, Debug)]
pub struct InMemoryUserDirectory {
    roles: Arc<RwLock<HashMap<UserId, Role>>>,
}

impl InMemoryUserDirectory {
    /// Create a new empty directory
    #[must_use]
    pub fn new() -> Self {
        Self {
            roles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a user with the given role and return their id
    pub fn add(&self, role: Role) -> UserId {
        let id = UserId::new();
        self.roles.write().unwrap().insert(id, role);
        id
    }

    /// Register an attendee and return their id
    pub fn add_attendee(&self) -> UserId {
        self.add(Role::Attendee)
    }

    /// Register an organizer and return their id
    pub fn add_organizer(&self) -> UserId {
        self.add(Role::Organizer)
    }

    /// Register an admin and return their id
    pub fn add_admin(&self) -> UserId {
        self.add(Role::Admin)
    }

    /// Remove a user
    pub fn remove(&self, id: UserId) {
        self.roles.write().unwrap().remove(&id);
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn role_of(
        &self,
        id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Role>, StoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.roles.read().unwrap().get(&id).copied()) })
    }
}

/// Payment gateway double that records every call.
///
/// The succeeding flavor acknowledges refunds with generated references;
/// the failing flavor rejects them. Poll answers can be staged per
/// reference with [`RecordingGateway::settle`].
#[derive(Clone, Debug)]
pub struct RecordingGateway {
    succeed: bool,
    refunds: Arc<RwLock<Vec<(String, Money)>>>,
    poll_answers: Arc<RwLock<HashMap<String, GatewayRefundStatus>>>,
}

impl RecordingGateway {
    /// Create a gateway that accepts every refund
    #[must_use]
    pub fn succeeding() -> Self {
        Self {
            succeed: true,
            refunds: Arc::new(RwLock::new(Vec::new())),
            poll_answers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a gateway that rejects every refund
    #[must_use]
    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::succeeding()
        }
    }

    /// Every refund issued so far, as (payment reference, amount) pairs
    #[must_use]
    pub fn refunds(&self) -> Vec<(String, Money)> {
        self.refunds.read().unwrap().clone()
    }

    /// Stage the answer for polling the given refund reference
    pub fn settle(&self, refund_reference: &str, status: GatewayRefundStatus) {
        self.poll_answers
            .write()
            .unwrap()
            .insert(refund_reference.to_string(), status);
    }
}

impl PaymentGateway for RecordingGateway {
    fn issue_refund(
        &self,
        payment_reference: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<String>> + Send>> {
        let succeed = self.succeed;
        let refunds = Arc::clone(&self.refunds);
        let payment_reference = payment_reference.to_string();
        Box::pin(async move {
            if !succeed {
                return Err(GatewayError::Rejected {
                    reason: "card issuer declined the refund".to_string(),
                });
            }
            let mut refunds = refunds.write().unwrap();
            refunds.push((payment_reference, amount));
            Ok(format!("rf_{:04}", refunds.len()))
        })
    }

    fn refund_status(
        &self,
        refund_reference: &str,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<GatewayRefundStatus>> + Send>> {
        let answers = Arc::clone(&self.poll_answers);
        let refund_reference = refund_reference.to_string();
        Box::pin(async move {
            Ok(answers
                .read()
                .unwrap()
                .get(&refund_reference)
                .copied()
                .unwrap_or(GatewayRefundStatus::Pending))
        })
    }
}

/// Notifier double that records every notice it is handed
#[derive(Clone, Debug)]
pub struct RecordingNotifier {
    notices: Arc<RwLock<Vec<Notice>>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Create a notifier that accepts every notice
    #[must_use]
    pub fn new() -> Self {
        Self {
            notices: Arc::new(RwLock::new(Vec::new())),
            fail: false,
        }
    }

    /// Create a notifier that refuses every notice
    #[must_use]
    pub fn failing() -> Self {
        Self {
            notices: Arc::new(RwLock::new(Vec::new())),
            fail: true,
        }
    }

    /// Every notice recorded so far
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.read().unwrap().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send>> {
        let notices = Arc::clone(&self.notices);
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                return Err(NotifyError("delivery channel closed".to_string()));
            }
            notices.write().unwrap().push(notice);
            Ok(())
        })
    }
}

/// Clock pinned to a fixed instant
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Create a clock pinned to the given instant
    #[must_use]
    pub const fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The instant every test clock reads: 2025-06-15 12:00:00 UTC.
///
/// Event fixtures place their dates relative to this, so refund tiers in
/// tests are exact rather than racing the wall clock.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
}

/// A clock pinned to [`test_now`]
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::at(test_now())
}
