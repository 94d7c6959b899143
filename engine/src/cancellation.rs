//! Booking cancellation and refunds.
//!
//! Self-service cancellation claims the booking first through the store's
//! guarded update, then settles the refund with the gateway. Claiming first
//! means a concurrent second cancel loses cleanly, and the gateway is never
//! called while any booking state is held. A gateway failure is recorded as
//! a failed refund; it never un-cancels the booking.
//!
//! Cancelling a whole event marks every active booking in one store call
//! and leaves each refund pending. Settling those refunds is an offline
//! concern; nothing in this path waits on the gateway.

use stagepass_core::error::{ConflictKind, CoreError};
use stagepass_core::ports::{CancellationUpdate, GatewayError, Notice};
use stagepass_core::refund::{RefundQuote, calculate_refund};
use stagepass_core::types::{
    Booking, BookingId, CancellationOutcome, EventCancellationOutcome, EventId, EventSnapshot,
    Money, RefundStatus, Role, UserId,
};

use crate::environment::Environment;

/// Where a booking's refund stands, for the holder to poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefundStatusReport {
    /// The booking the refund belongs to
    pub booking_id: BookingId,
    /// Refund standing as currently recorded
    pub status: RefundStatus,
    /// Amount owed or paid, once a cancellation fixed it
    pub amount: Option<Money>,
    /// Gateway reference, once the gateway accepted the refund
    pub reference: Option<String>,
}

/// Cancels bookings and settles their refunds
#[derive(Clone)]
pub struct CancellationWorkflow {
    env: Environment,
}

impl CancellationWorkflow {
    /// Creates a workflow over the given environment.
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Cancels a booking on behalf of its holder and settles the refund.
    ///
    /// The refund is priced from the booking's snapshot amount and the
    /// event's current policy. The gateway is asked to pay it only when the
    /// booking carries a payment reference and the amount is not zero; a
    /// gateway failure leaves the booking cancelled with the refund marked
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown booking or event,
    /// [`CoreError::Unauthorized`] when the caller is not the holder,
    /// [`CoreError::EventClosed`] once the event has happened, and
    /// [`CoreError::Conflict`] with [`ConflictKind::AlreadyCancelled`] when
    /// the booking is no longer active.
    pub async fn cancel(
        &self,
        booking_id: BookingId,
        requested_by: UserId,
        reason: Option<String>,
    ) -> Result<CancellationOutcome, CoreError> {
        let booking = self.booking(booking_id).await?;
        if booking.user_id != requested_by {
            return Err(CoreError::unauthorized(
                "only the booking holder may cancel it",
            ));
        }
        if booking.is_cancelled() {
            return Err(ConflictKind::AlreadyCancelled.into());
        }

        let event = self.event(booking.event_id).await?;
        let now = self.env.clock().now();
        if event.date <= now {
            return Err(CoreError::EventClosed(
                "event has already happened".to_string(),
            ));
        }
        let quote = calculate_refund(
            event.date,
            now,
            booking.total_amount,
            1,
            event.refund_policy.unwrap_or_default(),
        )?;

        let payable = !quote.amount.is_zero() && booking.payment_reference.is_some();
        let claimed_status = if payable {
            RefundStatus::Pending
        } else {
            RefundStatus::None
        };

        // The claim is the authoritative cancel; a concurrent second cancel
        // fails here with AlreadyCancelled and never reaches the gateway.
        let cancelled = self
            .env
            .store()
            .cancel_booking(
                booking_id,
                CancellationUpdate {
                    cancelled_at: now,
                    reason,
                    refund_status: claimed_status,
                    refund_amount: quote.amount,
                },
            )
            .await?;

        let (refund_status, refund_reference) = if payable {
            self.settle_refund(&cancelled, quote.amount).await?
        } else {
            (RefundStatus::None, None)
        };

        self.env.notify_detached(Notice::BookingCancelled {
            user_id: cancelled.user_id,
            event_name: event.name.clone(),
            booking_id,
            refund_amount: quote.amount,
            refund_status,
        });
        tracing::info!(
            booking_id = %booking_id,
            event_id = %cancelled.event_id,
            refund = %quote.amount,
            status = %refund_status,
            "booking cancelled"
        );

        Ok(CancellationOutcome {
            booking_id,
            cancelled_at: now,
            quote,
            refund_status,
            refund_reference,
        })
    }

    /// Pays the claimed refund and records how it went.
    async fn settle_refund(
        &self,
        cancelled: &Booking,
        amount: Money,
    ) -> Result<(RefundStatus, Option<String>), CoreError> {
        let reference = cancelled
            .payment_reference
            .as_deref()
            .ok_or_else(|| CoreError::storage("claimed refund lost its payment reference"))?;

        match self.env.gateway().issue_refund(reference, amount).await {
            Ok(refund_reference) => {
                self.env
                    .store()
                    .record_refund_outcome(
                        cancelled.id,
                        RefundStatus::Processed,
                        Some(refund_reference.clone()),
                    )
                    .await?;
                Ok((RefundStatus::Processed, Some(refund_reference)))
            }
            Err(error) => {
                tracing::warn!(
                    booking_id = %cancelled.id,
                    %error,
                    "refund rejected by the payment gateway"
                );
                self.env
                    .store()
                    .record_refund_outcome(cancelled.id, RefundStatus::Failed, None)
                    .await?;
                Ok((RefundStatus::Failed, None))
            }
        }
    }

    /// Cancels every active booking of an event in one store call.
    ///
    /// Allowed for the event's organizer and for admins. Each affected
    /// booking is left with its refund pending; settlement happens offline
    /// and no gateway call is made here.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown event or caller and
    /// [`CoreError::Unauthorized`] for anyone who does not run the event.
    pub async fn cancel_event_bookings(
        &self,
        event_id: EventId,
        requested_by: UserId,
        reason: Option<String>,
    ) -> Result<EventCancellationOutcome, CoreError> {
        let event = self.event(event_id).await?;
        let role = self
            .env
            .directory()
            .role_of(requested_by)
            .await?
            .ok_or_else(|| CoreError::not_found("user", requested_by))?;
        let runs_event = role == Role::Admin
            || (role == Role::Organizer && event.organizer_id == requested_by);
        if !runs_event {
            return Err(CoreError::unauthorized(
                "only the event's organizer or an admin may cancel its bookings",
            ));
        }

        let now = self.env.clock().now();
        let reason = reason.unwrap_or_else(|| format!("event {} cancelled", event.name));
        let bookings_cancelled = self
            .env
            .store()
            .cancel_event_bookings(event_id, now, reason)
            .await?;

        tracing::info!(
            event_id = %event_id,
            bookings_cancelled,
            "event bookings cancelled, refunds left pending"
        );

        Ok(EventCancellationOutcome {
            event_id,
            bookings_cancelled,
        })
    }

    /// Prices what cancelling the booking right now would refund, without
    /// cancelling anything.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown booking or event,
    /// [`CoreError::Unauthorized`] for anyone but the holder,
    /// [`CoreError::EventClosed`] once the event has happened, and
    /// [`CoreError::Conflict`] when the booking is already cancelled.
    pub async fn refund_quote(
        &self,
        booking_id: BookingId,
        requested_by: UserId,
    ) -> Result<RefundQuote, CoreError> {
        let booking = self.booking(booking_id).await?;
        if booking.user_id != requested_by {
            return Err(CoreError::unauthorized(
                "only the booking holder may quote its refund",
            ));
        }
        if booking.is_cancelled() {
            return Err(ConflictKind::AlreadyCancelled.into());
        }

        let event = self.event(booking.event_id).await?;
        let now = self.env.clock().now();
        if event.date <= now {
            return Err(CoreError::EventClosed(
                "event has already happened".to_string(),
            ));
        }
        calculate_refund(
            event.date,
            now,
            booking.total_amount,
            1,
            event.refund_policy.unwrap_or_default(),
        )
    }

    /// Reports where the booking's refund stands.
    ///
    /// A pending refund that already has a gateway reference is re-checked
    /// against the gateway and the answer persisted; an unreachable gateway
    /// just leaves the recorded standing as is.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown booking and
    /// [`CoreError::Unauthorized`] for anyone but the holder.
    pub async fn refund_status(
        &self,
        booking_id: BookingId,
        requested_by: UserId,
    ) -> Result<RefundStatusReport, CoreError> {
        let booking = self.booking(booking_id).await?;
        if booking.user_id != requested_by {
            return Err(CoreError::unauthorized(
                "only the booking holder may see its refund",
            ));
        }

        let mut status = booking.refund_status;
        let reference = booking.refund_reference.clone();
        if status == RefundStatus::Pending {
            if let Some(reference) = reference.as_deref() {
                status = self.poll_gateway(booking_id, reference, status).await?;
            }
        }

        Ok(RefundStatusReport {
            booking_id,
            status,
            amount: booking.refund_amount,
            reference,
        })
    }

    /// Fetches a booking for its holder, a thin read behind booking detail
    /// screens.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown booking and
    /// [`CoreError::Unauthorized`] for anyone but the holder.
    pub async fn booking_for_holder(
        &self,
        booking_id: BookingId,
        requested_by: UserId,
    ) -> Result<Booking, CoreError> {
        let booking = self.booking(booking_id).await?;
        if booking.user_id != requested_by {
            return Err(CoreError::unauthorized(
                "only the booking holder may view it",
            ));
        }
        Ok(booking)
    }

    async fn poll_gateway(
        &self,
        booking_id: BookingId,
        reference: &str,
        recorded: RefundStatus,
    ) -> Result<RefundStatus, CoreError> {
        use stagepass_core::ports::GatewayRefundStatus;

        let answer = match self.env.gateway().refund_status(reference).await {
            Ok(answer) => answer,
            Err(GatewayError::Timeout | GatewayError::Other { .. }) => {
                tracing::warn!(booking_id = %booking_id, "gateway unreachable, reporting recorded standing");
                return Ok(recorded);
            }
            Err(GatewayError::Rejected { reason }) => {
                return Err(CoreError::external("payment gateway", reason));
            }
        };

        let settled = match answer {
            GatewayRefundStatus::Pending => return Ok(recorded),
            GatewayRefundStatus::Completed => RefundStatus::Processed,
            GatewayRefundStatus::Failed => RefundStatus::Failed,
        };
        self.env
            .store()
            .record_refund_outcome(booking_id, settled, Some(reference.to_string()))
            .await?;
        Ok(settled)
    }

    async fn booking(&self, id: BookingId) -> Result<Booking, CoreError> {
        self.env
            .store()
            .booking_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", id))
    }

    async fn event(&self, id: EventId) -> Result<EventSnapshot, CoreError> {
        self.env
            .catalog()
            .event_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reservation::{ReservationCoordinator, ReservationRequest, SeatSelection};
    use chrono::Duration;
    use stagepass_core::refund::{RefundPolicy, RefundTier};
    use stagepass_testing::fixtures::EventBuilder;
    use stagepass_testing::mocks::{
        InMemoryBookingStore, InMemoryEventCatalog, InMemoryUserDirectory, RecordingGateway,
        RecordingNotifier, test_clock, test_now,
    };
    use std::sync::Arc;

    struct Harness {
        workflow: CancellationWorkflow,
        coordinator: ReservationCoordinator,
        store: Arc<InMemoryBookingStore>,
        catalog: Arc<InMemoryEventCatalog>,
        directory: Arc<InMemoryUserDirectory>,
        gateway: Arc<RecordingGateway>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with(gateway: RecordingGateway) -> Harness {
        let store = Arc::new(InMemoryBookingStore::new());
        let catalog = Arc::new(InMemoryEventCatalog::new());
        let directory = Arc::new(InMemoryUserDirectory::new());
        let gateway = Arc::new(gateway);
        let notifier = Arc::new(RecordingNotifier::new());
        let env = Environment::new(
            store.clone(),
            catalog.clone(),
            directory.clone(),
            gateway.clone(),
            notifier.clone(),
            Arc::new(test_clock()),
        );
        Harness {
            workflow: CancellationWorkflow::new(env.clone()),
            coordinator: ReservationCoordinator::new(env),
            store,
            catalog,
            directory,
            gateway,
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingGateway::succeeding())
    }

    async fn booked(
        h: &Harness,
        start_in: chrono::Duration,
        unit_price_cents: u64,
        quantity: u32,
        payment_reference: Option<&str>,
    ) -> (BookingId, UserId, EventId) {
        let event = EventBuilder::new()
            .starting_in(start_in)
            .flat(unit_price_cents, 100)
            .build();
        h.catalog.put(event.clone());
        let user = h.directory.add_attendee();
        let confirmation = h
            .coordinator
            .create(ReservationRequest {
                event_id: event.id,
                user_id: user,
                seats: SeatSelection::Flat { quantity },
                payment_reference: payment_reference.map(str::to_string),
            })
            .await
            .unwrap();
        (confirmation.booking.id, user, event.id)
    }

    async fn drain_notifications() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn an_early_cancellation_refunds_everything_through_the_gateway() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(10), 1000, 2, Some("pay_early")).await;

        let outcome = h
            .workflow
            .cancel(booking_id, user, Some("plans changed".to_string()))
            .await
            .unwrap();

        assert_eq!(outcome.quote.tier, RefundTier::Early);
        assert_eq!(outcome.quote.percentage, 100);
        assert_eq!(outcome.quote.amount, Money::from_cents(2000));
        assert_eq!(outcome.refund_status, RefundStatus::Processed);
        assert!(outcome.refund_reference.is_some());

        let refunds = h.gateway.refunds();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0], ("pay_early".to_string(), Money::from_cents(2000)));

        let stored = h.store.booking(booking_id).unwrap();
        assert!(stored.cancelled_by_user);
        assert!(!stored.cancelled_by_event);
        assert_eq!(stored.cancellation_reason.as_deref(), Some("plans changed"));
        assert_eq!(stored.refund_status, RefundStatus::Processed);
        assert_eq!(stored.refund_amount, Some(Money::from_cents(2000)));
    }

    #[tokio::test]
    async fn a_standard_window_cancellation_refunds_half() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(5), 1000, 2, Some("pay_std")).await;

        let outcome = h.workflow.cancel(booking_id, user, None).await.unwrap();

        assert_eq!(outcome.quote.percentage, 50);
        assert_eq!(outcome.quote.amount, Money::from_cents(1000));
        assert_eq!(outcome.refund_status, RefundStatus::Processed);
    }

    #[tokio::test]
    async fn a_late_cancellation_refunds_nothing_and_skips_the_gateway() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::hours(12), 800, 3, Some("pay_late")).await;

        let outcome = h.workflow.cancel(booking_id, user, None).await.unwrap();

        assert_eq!(outcome.quote.percentage, 0);
        assert!(outcome.quote.amount.is_zero());
        assert_eq!(outcome.refund_status, RefundStatus::None);
        assert!(outcome.refund_reference.is_none());
        assert!(h.gateway.refunds().is_empty());

        let stored = h.store.booking(booking_id).unwrap();
        assert!(stored.cancelled_by_user);
        assert_eq!(stored.refund_status, RefundStatus::None);
    }

    #[tokio::test]
    async fn an_unpaid_booking_cancels_without_any_gateway_call() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(10), 1000, 1, None).await;

        let outcome = h.workflow.cancel(booking_id, user, None).await.unwrap();

        assert_eq!(outcome.quote.percentage, 100);
        assert_eq!(outcome.refund_status, RefundStatus::None);
        assert!(h.gateway.refunds().is_empty());
    }

    #[tokio::test]
    async fn a_gateway_failure_marks_the_refund_failed_but_cancels_anyway() {
        let h = harness_with(RecordingGateway::failing());
        let (booking_id, user, _) = booked(&h, Duration::days(10), 1000, 2, Some("pay_fail")).await;

        let outcome = h.workflow.cancel(booking_id, user, None).await.unwrap();

        assert_eq!(outcome.refund_status, RefundStatus::Failed);
        assert!(outcome.refund_reference.is_none());

        let stored = h.store.booking(booking_id).unwrap();
        assert!(stored.cancelled_by_user);
        assert_eq!(stored.refund_status, RefundStatus::Failed);
        assert_eq!(stored.refund_amount, Some(Money::from_cents(2000)));
    }

    #[tokio::test]
    async fn cancellation_notices_carry_the_refund_outcome() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(10), 1000, 1, Some("pay_n")).await;

        h.workflow.cancel(booking_id, user, None).await.unwrap();
        drain_notifications().await;

        let notices = h.notifier.notices();
        assert!(notices.iter().any(|n| matches!(
            n,
            Notice::BookingCancelled { refund_status: RefundStatus::Processed, .. }
        )));
    }

    #[tokio::test]
    async fn only_the_holder_may_cancel() {
        let h = harness();
        let (booking_id, _, _) = booked(&h, Duration::days(10), 1000, 1, None).await;
        let stranger = h.directory.add_attendee();

        let err = h
            .workflow
            .cancel(booking_id, stranger, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));

        assert!(h.store.booking(booking_id).unwrap().is_active());
    }

    #[tokio::test]
    async fn cancelling_twice_conflicts_and_never_refunds_twice() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(10), 1000, 1, Some("pay_twice")).await;

        h.workflow.cancel(booking_id, user, None).await.unwrap();
        let err = h.workflow.cancel(booking_id, user, None).await.unwrap_err();

        assert_eq!(err, CoreError::Conflict(ConflictKind::AlreadyCancelled));
        assert_eq!(h.gateway.refunds().len(), 1);
    }

    #[tokio::test]
    async fn unknown_bookings_are_not_found() {
        let h = harness();
        let user = h.directory.add_attendee();
        let err = h
            .workflow
            .cancel(BookingId::new(), user, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { resource: "booking", .. }));
    }

    #[tokio::test]
    async fn a_booking_on_a_past_event_can_no_longer_be_cancelled() {
        let h = harness();
        let event = EventBuilder::new().days_until(10).flat(1000, 100).build();
        h.catalog.put(event.clone());
        let user = h.directory.add_attendee();
        let confirmation = h
            .coordinator
            .create(ReservationRequest {
                event_id: event.id,
                user_id: user,
                seats: SeatSelection::Flat { quantity: 1 },
                payment_reference: Some("pay_past".to_string()),
            })
            .await
            .unwrap();

        // The event happens before the holder gets around to cancelling.
        let mut past = event;
        past.date = test_now() - Duration::days(1);
        h.catalog.put(past);

        let err = h
            .workflow
            .cancel(confirmation.booking.id, user, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EventClosed(_)));
        assert!(h.store.booking(confirmation.booking.id).unwrap().is_active());

        let err = h
            .workflow
            .refund_quote(confirmation.booking.id, user)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EventClosed(_)));
    }

    #[tokio::test]
    async fn a_per_event_policy_overrides_the_defaults() {
        let h = harness();
        let event = EventBuilder::new()
            .days_until(5)
            .flat(1000, 100)
            .refund_policy(RefundPolicy::new(100, 90, 25))
            .build();
        h.catalog.put(event.clone());
        let user = h.directory.add_attendee();
        let confirmation = h
            .coordinator
            .create(ReservationRequest {
                event_id: event.id,
                user_id: user,
                seats: SeatSelection::Flat { quantity: 2 },
                payment_reference: Some("pay_ovr".to_string()),
            })
            .await
            .unwrap();

        let outcome = h
            .workflow
            .cancel(confirmation.booking.id, user, None)
            .await
            .unwrap();

        assert_eq!(outcome.quote.percentage, 90);
        assert_eq!(outcome.quote.amount, Money::from_cents(1800));
    }

    #[tokio::test]
    async fn quotes_preview_without_cancelling() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(7), 500, 1, None).await;

        let quote = h.workflow.refund_quote(booking_id, user).await.unwrap();
        assert_eq!(quote.percentage, 100);
        assert_eq!(quote.amount, Money::from_cents(500));

        assert!(h.store.booking(booking_id).unwrap().is_active());

        let stranger = h.directory.add_attendee();
        let err = h
            .workflow
            .refund_quote(booking_id, stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn holders_see_their_booking_and_strangers_do_not() {
        let h = harness();
        let (booking_id, user, event_id) = booked(&h, Duration::days(10), 1000, 2, None).await;

        let booking = h
            .workflow
            .booking_for_holder(booking_id, user)
            .await
            .unwrap();
        assert_eq!(booking.event_id, event_id);
        assert_eq!(booking.total_quantity, 2);

        let stranger = h.directory.add_attendee();
        let err = h
            .workflow
            .booking_for_holder(booking_id, stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn refund_status_reports_the_recorded_standing() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(10), 1000, 2, Some("pay_rs")).await;

        let before = h.workflow.refund_status(booking_id, user).await.unwrap();
        assert_eq!(before.status, RefundStatus::None);
        assert_eq!(before.amount, None);

        h.workflow.cancel(booking_id, user, None).await.unwrap();

        let after = h.workflow.refund_status(booking_id, user).await.unwrap();
        assert_eq!(after.status, RefundStatus::Processed);
        assert_eq!(after.amount, Some(Money::from_cents(2000)));
        assert!(after.reference.is_some());
    }

    #[tokio::test]
    async fn a_pending_refund_with_a_reference_is_settled_by_polling() {
        let h = harness();
        let (booking_id, user, _) = booked(&h, Duration::days(10), 1000, 1, Some("pay_poll")).await;

        h.store.set_refund(
            booking_id,
            RefundStatus::Pending,
            Some(Money::from_cents(1000)),
            Some("rf_poll".to_string()),
        );
        h.gateway
            .settle("rf_poll", stagepass_core::ports::GatewayRefundStatus::Completed);

        let report = h.workflow.refund_status(booking_id, user).await.unwrap();
        assert_eq!(report.status, RefundStatus::Processed);

        let stored = h.store.booking(booking_id).unwrap();
        assert_eq!(stored.refund_status, RefundStatus::Processed);
    }

    #[tokio::test]
    async fn organizers_cancel_their_event_in_bulk_without_gateway_calls() {
        let h = harness();
        let organizer = h.directory.add_organizer();
        let event = EventBuilder::new()
            .days_until(10)
            .flat(1000, 100)
            .organizer(organizer)
            .build();
        h.catalog.put(event.clone());

        let mut holders = Vec::new();
        for _ in 0..3 {
            let user = h.directory.add_attendee();
            let confirmation = h
                .coordinator
                .create(ReservationRequest {
                    event_id: event.id,
                    user_id: user,
                    seats: SeatSelection::Flat { quantity: 2 },
                    payment_reference: Some("pay_bulk".to_string()),
                })
                .await
                .unwrap();
            holders.push(confirmation.booking.id);
        }

        let outcome = h
            .workflow
            .cancel_event_bookings(event.id, organizer, Some("venue flooded".to_string()))
            .await
            .unwrap();

        assert_eq!(outcome.bookings_cancelled, 3);
        assert!(h.gateway.refunds().is_empty());
        for booking_id in holders {
            let stored = h.store.booking(booking_id).unwrap();
            assert!(stored.cancelled_by_event);
            assert!(!stored.cancelled_by_user);
            assert_eq!(stored.refund_status, RefundStatus::Pending);
            assert_eq!(stored.cancellation_reason.as_deref(), Some("venue flooded"));
        }
    }

    #[tokio::test]
    async fn bulk_cancellation_skips_already_cancelled_bookings() {
        let h = harness();
        let organizer = h.directory.add_organizer();
        let event = EventBuilder::new()
            .days_until(10)
            .flat(1000, 100)
            .organizer(organizer)
            .build();
        h.catalog.put(event.clone());

        let user = h.directory.add_attendee();
        let confirmation = h
            .coordinator
            .create(ReservationRequest {
                event_id: event.id,
                user_id: user,
                seats: SeatSelection::Flat { quantity: 1 },
                payment_reference: Some("pay_skip".to_string()),
            })
            .await
            .unwrap();
        h.workflow
            .cancel(confirmation.booking.id, user, None)
            .await
            .unwrap();

        let outcome = h
            .workflow
            .cancel_event_bookings(event.id, organizer, None)
            .await
            .unwrap();

        assert_eq!(outcome.bookings_cancelled, 0);
        let stored = h.store.booking(confirmation.booking.id).unwrap();
        assert!(stored.cancelled_by_user);
        assert!(!stored.cancelled_by_event);
    }

    #[tokio::test]
    async fn only_the_organizer_of_the_event_or_an_admin_may_bulk_cancel() {
        let h = harness();
        let organizer = h.directory.add_organizer();
        let event = EventBuilder::new().organizer(organizer).flat(1000, 10).build();
        h.catalog.put(event.clone());

        let attendee = h.directory.add_attendee();
        let err = h
            .workflow
            .cancel_event_bookings(event.id, attendee, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));

        let other_organizer = h.directory.add_organizer();
        let err = h
            .workflow
            .cancel_event_bookings(event.id, other_organizer, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));

        let admin = h.directory.add_admin();
        h.workflow
            .cancel_event_bookings(event.id, admin, None)
            .await
            .unwrap();
    }
}
