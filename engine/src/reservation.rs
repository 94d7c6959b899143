//! Reservation coordination.
//!
//! Validates a reservation request against the catalog and the duplicate
//! rule, prices the seats from the event's current plan, issues the ticket
//! identity and proof, and commits through the store's guarded insert. The
//! store re-validates capacity and the duplicate rule inside its own
//! critical section, so the checks here only shape friendly errors; they
//! are not what keeps concurrent writers out.

use stagepass_core::error::CoreError;
use stagepass_core::ports::{Notice, StoreError};
use stagepass_core::proof::{self, ProofPayload};
use stagepass_core::ticket::TicketIssuer;
use stagepass_core::types::{
    Booking, BookingLines, EventId, EventSnapshot, LineItem, MAX_LINE_QUANTITY,
    MAX_TICKET_CATEGORIES, SeatPlan, UserId,
};

use crate::environment::Environment;

/// How many ticket-id collisions at insert time we absorb before giving up.
/// With 256-bit tokens a single collision already means something is wrong.
const INSERT_RETRY_LIMIT: u32 = 3;

/// The seats a user asks for, before pricing
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeatSelection {
    /// Seats from an event's single flat pool
    Flat {
        /// Number of seats
        quantity: u32,
    },
    /// Seats from one or more named categories
    Categorized {
        /// Requested categories
        items: Vec<CategorySelection>,
    },
}

/// One category's worth of a categorized request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategorySelection {
    /// Category name as listed on the event
    pub category: String,
    /// Number of seats
    pub quantity: u32,
}

/// A fully specified reservation request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservationRequest {
    /// Event to reserve seats for
    pub event_id: EventId,
    /// User who will hold the booking
    pub user_id: UserId,
    /// The seats being asked for
    pub seats: SeatSelection,
    /// Gateway reference from the purchase flow, kept for later refunds
    pub payment_reference: Option<String>,
}

/// A committed reservation plus its scannable proof
#[derive(Clone, Debug, PartialEq)]
pub struct ReservationConfirmation {
    /// The booking as persisted
    pub booking: Booking,
    /// The proof payload rendered as an SVG QR code
    pub barcode_svg: String,
}

/// Validates, prices, and commits reservations
#[derive(Clone)]
pub struct ReservationCoordinator {
    env: Environment,
}

impl ReservationCoordinator {
    /// Creates a coordinator over the given environment.
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    /// Reserves seats and returns the confirmed booking with its proof.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for a missing event or user,
    /// [`CoreError::EventClosed`] when the event is cancelled or already
    /// happened, [`CoreError::Validation`] for out-of-range or mispriced
    /// requests, and [`CoreError::Conflict`] when the user already holds an
    /// active booking or the seats no longer fit.
    pub async fn create(
        &self,
        request: ReservationRequest,
    ) -> Result<ReservationConfirmation, CoreError> {
        let now = self.env.clock().now();

        let event = self
            .env
            .catalog()
            .event_by_id(request.event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("event", request.event_id))?;
        if event.cancelled {
            return Err(CoreError::EventClosed("event is cancelled".to_string()));
        }
        if event.date <= now {
            return Err(CoreError::EventClosed(
                "event has already happened".to_string(),
            ));
        }

        self.env
            .directory()
            .role_of(request.user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", request.user_id))?;

        if self
            .env
            .store()
            .has_active_booking(request.event_id, request.user_id)
            .await?
        {
            return Err(stagepass_core::ConflictKind::DuplicateReservation.into());
        }

        let lines = price_selection(&event.seat_plan, &request.seats)?;
        let booking = self.commit(&request, &event, lines, now).await?;

        self.env.notify_detached(Notice::BookingConfirmed {
            user_id: booking.user_id,
            event_name: event.name.clone(),
            booking_id: booking.id,
            ticket_id: booking.ticket_id.clone(),
            total_amount: booking.total_amount,
        });
        tracing::info!(
            booking_id = %booking.id,
            event_id = %booking.event_id,
            user_id = %booking.user_id,
            quantity = booking.total_quantity,
            "reservation confirmed"
        );

        let barcode_svg = proof::render_qr_svg(&booking.proof_payload)?;
        Ok(ReservationConfirmation {
            booking,
            barcode_svg,
        })
    }

    /// Issues an identity and inserts, redrawing the token if the store's
    /// uniqueness constraint fires.
    async fn commit(
        &self,
        request: &ReservationRequest,
        event: &EventSnapshot,
        lines: BookingLines,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Booking, CoreError> {
        let issuer = TicketIssuer::default();

        for attempt in 1..=INSERT_RETRY_LIMIT {
            let ticket_id = issuer.issue(self.env.store()).await?;
            let payload = ProofPayload::new(ticket_id.clone(), event.id, now);
            let payload_text = proof::encode(&payload)?;

            let booking = Booking::new(
                event.id,
                request.user_id,
                lines.clone(),
                ticket_id,
                payload_text,
                request.payment_reference.clone(),
                now,
            )
            .ok_or_else(|| CoreError::validation("booking total overflows"))?;

            match self
                .env
                .store()
                .insert_booking(&booking, &event.seat_plan)
                .await
            {
                Ok(()) => return Ok(booking),
                Err(StoreError::TicketIdTaken) => {
                    tracing::warn!(attempt, "ticket id collision on insert, redrawing");
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(CoreError::storage(
            "ticket id collisions exhausted every insert retry",
        ))
    }
}

/// Prices a selection against the event's current plan, capturing the
/// snapshot prices the booking will keep forever.
fn price_selection(plan: &SeatPlan, seats: &SeatSelection) -> Result<BookingLines, CoreError> {
    match seats {
        SeatSelection::Flat { quantity } => {
            validate_quantity(*quantity, None)?;
            let SeatPlan::Flat { price, .. } = plan else {
                return Err(CoreError::validation(
                    "event sells seats by category; pick categories",
                ));
            };
            Ok(BookingLines::Flat {
                quantity: *quantity,
                unit_price: *price,
            })
        }
        SeatSelection::Categorized { items } => {
            if items.is_empty() {
                return Err(CoreError::validation("no categories requested"));
            }
            if items.len() > MAX_TICKET_CATEGORIES {
                return Err(CoreError::validation(format!(
                    "at most {MAX_TICKET_CATEGORIES} categories per reservation"
                )));
            }
            let mut priced = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                validate_quantity(item.quantity, Some(&item.category))?;
                if items[..index].iter().any(|i| i.category == item.category) {
                    return Err(CoreError::validation(format!(
                        "category {} requested twice",
                        item.category
                    )));
                }
                let category = plan.category(&item.category).ok_or_else(|| {
                    CoreError::validation(format!(
                        "event has no category named {}",
                        item.category
                    ))
                })?;
                priced.push(
                    LineItem::new(item.category.clone(), item.quantity, category.price)
                        .ok_or_else(|| CoreError::validation("line subtotal overflows"))?,
                );
            }
            Ok(BookingLines::Categorized { items: priced })
        }
    }
}

fn validate_quantity(quantity: u32, category: Option<&str>) -> Result<(), CoreError> {
    if quantity == 0 || quantity > MAX_LINE_QUANTITY {
        let place = category.map_or_else(String::new, |c| format!(" for category {c}"));
        return Err(CoreError::validation(format!(
            "quantity{place} must be between 1 and {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}
