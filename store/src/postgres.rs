//! `PostgreSQL` booking store.
//!
//! All three write-side races live here, closed by the database itself:
//!
//! - Overbooking: the insert runs in a transaction that takes a per-event
//!   advisory lock, re-reads the event's active bookings, and re-checks the
//!   fit before writing. Writers for one event are serialized; readers and
//!   other events are untouched.
//! - Duplicate reservations and ticket-id collisions: partial and full
//!   unique indexes. The pre-checks upstream only shape error messages;
//!   the indexes are what hold under concurrency.
//! - Double verification and double cancellation: single conditional
//!   `UPDATE ... RETURNING` statements. Whoever loses the race gets no row
//!   back and a second read tells them why.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use stagepass_core::error::ConflictKind;
use stagepass_core::ledger::ensure_fit;
use stagepass_core::ports::{BookingStore, CancellationUpdate, StoreError};
use stagepass_core::types::{
    Booking, BookingId, EventId, Money, RefundStatus, SeatPlan, TicketId, UserId,
};
use std::future::Future;
use std::pin::Pin;

/// Column list shared by every query that reads whole bookings.
const BOOKING_COLUMNS: &str = "id, event_id, user_id, lines, total_quantity, \
     total_amount_cents, ticket_id, proof_payload, payment_reference, \
     verified, verified_at, created_at, cancelled_by_user, cancelled_by_event, \
     cancellation_date, cancellation_reason, refund_status, refund_amount_cents, \
     refund_reference";

/// Booking store backed by `PostgreSQL`
#[derive(Clone, Debug)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Create a new store over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BookingStore for PostgresBookingStore {
    fn insert_booking<'a>(
        &'a self,
        booking: &'a Booking,
        plan: &'a SeatPlan,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let lines = serde_json::to_value(&booking.lines)
                .map_err(|e| StoreError::Database(e.to_string()))?;
            let total_quantity = quantity_to_db(booking.total_quantity)?;
            let total_amount = cents_to_db(booking.total_amount)?;

            let mut tx = self.pool.begin().await.map_err(to_db_error)?;

            // Serializes writers per event; readers and other events are
            // not blocked. Released automatically at commit or rollback.
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(event_lock_key(booking.event_id))
                .execute(&mut *tx)
                .await
                .map_err(to_db_error)?;

            let rows = sqlx::query(&format!(
                r"
                SELECT {BOOKING_COLUMNS}
                FROM bookings
                WHERE event_id = $1
                  AND NOT cancelled_by_user AND NOT cancelled_by_event
                "
            ))
            .bind(booking.event_id.as_uuid())
            .fetch_all(&mut *tx)
            .await
            .map_err(to_db_error)?;
            let existing = rows
                .iter()
                .map(row_to_booking)
                .collect::<Result<Vec<_>, _>>()?;
            ensure_fit(plan, &existing, &booking.lines)?;

            sqlx::query(
                r"
                INSERT INTO bookings (
                    id, event_id, user_id, lines, total_quantity,
                    total_amount_cents, ticket_id, proof_payload,
                    payment_reference, verified, verified_at, created_at,
                    cancelled_by_user, cancelled_by_event, cancellation_date,
                    cancellation_reason, refund_status, refund_amount_cents,
                    refund_reference
                ) VALUES (
                    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19
                )
                ",
            )
            .bind(booking.id.as_uuid())
            .bind(booking.event_id.as_uuid())
            .bind(booking.user_id.as_uuid())
            .bind(&lines)
            .bind(total_quantity)
            .bind(total_amount)
            .bind(booking.ticket_id.as_str())
            .bind(&booking.proof_payload)
            .bind(booking.payment_reference.as_deref())
            .bind(booking.verified)
            .bind(booking.verified_at)
            .bind(booking.created_at)
            .bind(booking.cancelled_by_user)
            .bind(booking.cancelled_by_event)
            .bind(booking.cancellation_date)
            .bind(booking.cancellation_reason.as_deref())
            .bind(booking.refund_status.as_str())
            .bind(booking.refund_amount.map(cents_to_db).transpose()?)
            .bind(booking.refund_reference.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(map_insert_error)?;

            tx.commit().await.map_err(to_db_error)?;

            tracing::debug!(
                booking_id = %booking.id,
                event_id = %booking.event_id,
                quantity = booking.total_quantity,
                "booking inserted"
            );
            Ok(())
        })
    }

    fn ticket_id_exists<'a>(
        &'a self,
        ticket_id: &'a TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE ticket_id = $1)")
                .bind(ticket_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(to_db_error)
        })
    }

    fn booking_by_id(
        &self,
        id: BookingId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                r"SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
            ))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(to_db_error)?;
            row.as_ref().map(row_to_booking).transpose()
        })
    }

    fn booking_by_ticket<'a>(
        &'a self,
        ticket_id: &'a TicketId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Booking>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                r"SELECT {BOOKING_COLUMNS} FROM bookings WHERE ticket_id = $1"
            ))
            .bind(ticket_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(to_db_error)?;
            row.as_ref().map(row_to_booking).transpose()
        })
    }

    fn has_active_booking(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StoreError>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query_scalar(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM bookings
                    WHERE event_id = $1 AND user_id = $2
                      AND NOT cancelled_by_user AND NOT cancelled_by_event
                )
                ",
            )
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(to_db_error)
        })
    }

    fn active_bookings_for_event(
        &self,
        event_id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Booking>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                r"
                SELECT {BOOKING_COLUMNS}
                FROM bookings
                WHERE event_id = $1
                  AND NOT cancelled_by_user AND NOT cancelled_by_event
                ORDER BY created_at
                "
            ))
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(to_db_error)?;
            rows.iter().map(row_to_booking).collect()
        })
    }

    fn mark_verified<'a>(
        &'a self,
        ticket_id: &'a TicketId,
        verified_at: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let updated = sqlx::query(&format!(
                r"
                UPDATE bookings
                SET verified = TRUE, verified_at = $2
                WHERE ticket_id = $1 AND verified = FALSE
                  AND NOT cancelled_by_user AND NOT cancelled_by_event
                RETURNING {BOOKING_COLUMNS}
                "
            ))
            .bind(ticket_id.as_str())
            .bind(verified_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_db_error)?;

            if let Some(row) = updated {
                return row_to_booking(&row);
            }

            // No row was flipped; read once more to say why.
            let current = sqlx::query(&format!(
                r"SELECT {BOOKING_COLUMNS} FROM bookings WHERE ticket_id = $1"
            ))
            .bind(ticket_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(to_db_error)?;

            match current {
                None => Err(StoreError::BookingNotFound(ticket_id.to_string())),
                Some(row) => {
                    let booking = row_to_booking(&row)?;
                    if booking.is_cancelled() {
                        Err(ConflictKind::AlreadyCancelled.into())
                    } else {
                        Err(ConflictKind::TicketAlreadyUsed.into())
                    }
                }
            }
        })
    }

    fn cancel_booking(
        &self,
        id: BookingId,
        update: CancellationUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<Booking, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let refund_amount = cents_to_db(update.refund_amount)?;
            let updated = sqlx::query(&format!(
                r"
                UPDATE bookings
                SET cancelled_by_user = TRUE,
                    cancellation_date = $2,
                    cancellation_reason = $3,
                    refund_status = $4,
                    refund_amount_cents = $5
                WHERE id = $1
                  AND NOT cancelled_by_user AND NOT cancelled_by_event
                RETURNING {BOOKING_COLUMNS}
                "
            ))
            .bind(id.as_uuid())
            .bind(update.cancelled_at)
            .bind(update.reason.as_deref())
            .bind(update.refund_status.as_str())
            .bind(refund_amount)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_db_error)?;

            if let Some(row) = updated {
                return row_to_booking(&row);
            }

            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE id = $1)")
                    .bind(id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(to_db_error)?;
            if exists {
                Err(ConflictKind::AlreadyCancelled.into())
            } else {
                Err(StoreError::BookingNotFound(id.to_string()))
            }
        })
    }

    fn record_refund_outcome(
        &self,
        id: BookingId,
        status: RefundStatus,
        reference: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE bookings
                SET refund_status = $2, refund_reference = $3
                WHERE id = $1
                ",
            )
            .bind(id.as_uuid())
            .bind(status.as_str())
            .bind(reference.as_deref())
            .execute(&self.pool)
            .await
            .map_err(to_db_error)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::BookingNotFound(id.to_string()));
            }
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
            let result = sqlx::query(
                r"
                UPDATE bookings
                SET cancelled_by_event = TRUE,
                    cancellation_date = $2,
                    cancellation_reason = $3,
                    refund_status = 'pending',
                    refund_amount_cents = total_amount_cents
                WHERE event_id = $1
                  AND NOT cancelled_by_user AND NOT cancelled_by_event
                ",
            )
            .bind(event_id.as_uuid())
            .bind(cancelled_at)
            .bind(&reason)
            .execute(&self.pool)
            .await
            .map_err(to_db_error)?;

            let touched = result.rows_affected();
            tracing::info!(
                event_id = %event_id,
                bookings_cancelled = touched,
                "event bookings cancelled in bulk"
            );
            Ok(touched)
        })
    }
}

/// Convert a database row to a [`Booking`].
fn row_to_booking(row: &PgRow) -> Result<Booking, StoreError> {
    let lines_json: serde_json::Value = row.try_get("lines").map_err(to_db_error)?;
    let lines =
        serde_json::from_value(lines_json).map_err(|e| StoreError::Database(e.to_string()))?;

    let total_quantity: i32 = row.try_get("total_quantity").map_err(to_db_error)?;
    let total_amount: i64 = row.try_get("total_amount_cents").map_err(to_db_error)?;
    let refund_amount: Option<i64> = row.try_get("refund_amount_cents").map_err(to_db_error)?;

    let refund_status: String = row.try_get("refund_status").map_err(to_db_error)?;
    let refund_status = refund_status
        .parse::<RefundStatus>()
        .map_err(StoreError::Database)?;

    let ticket_id: String = row.try_get("ticket_id").map_err(to_db_error)?;

    Ok(Booking {
        id: BookingId::from_uuid(row.try_get("id").map_err(to_db_error)?),
        event_id: EventId::from_uuid(row.try_get("event_id").map_err(to_db_error)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(to_db_error)?),
        lines,
        total_quantity: quantity_from_db(total_quantity)?,
        total_amount: cents_from_db(total_amount)?,
        ticket_id: TicketId::from_token(ticket_id),
        proof_payload: row.try_get("proof_payload").map_err(to_db_error)?,
        payment_reference: row.try_get("payment_reference").map_err(to_db_error)?,
        verified: row.try_get("verified").map_err(to_db_error)?,
        verified_at: row.try_get("verified_at").map_err(to_db_error)?,
        created_at: row.try_get("created_at").map_err(to_db_error)?,
        cancelled_by_user: row.try_get("cancelled_by_user").map_err(to_db_error)?,
        cancelled_by_event: row.try_get("cancelled_by_event").map_err(to_db_error)?,
        cancellation_date: row.try_get("cancellation_date").map_err(to_db_error)?,
        cancellation_reason: row.try_get("cancellation_reason").map_err(to_db_error)?,
        refund_status,
        refund_amount: refund_amount.map(cents_from_db).transpose()?,
        refund_reference: row.try_get("refund_reference").map_err(to_db_error)?,
    })
}

fn to_db_error(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}

/// Maps unique-index violations on insert to their domain conflicts.
fn map_insert_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return match db.constraint() {
                Some("bookings_ticket_id_key") => StoreError::TicketIdTaken,
                Some("bookings_one_active_per_user_event") => {
                    ConflictKind::DuplicateReservation.into()
                }
                _ => StoreError::Database(db.to_string()),
            };
        }
    }
    StoreError::Database(error.to_string())
}

// Stable 64-bit key for pg_advisory_xact_lock; the wrap is harmless, the
// key only has to be the same for the same event.
#[allow(clippy::cast_possible_wrap)]
fn event_lock_key(event_id: EventId) -> i64 {
    (event_id.as_uuid().as_u128() >> 64) as i64
}

fn cents_to_db(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.cents())
        .map_err(|_| StoreError::Database("amount exceeds bigint range".to_string()))
}

fn cents_from_db(cents: i64) -> Result<Money, StoreError> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| StoreError::Database(format!("negative amount in bookings row: {cents}")))
}

fn quantity_to_db(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Database("quantity exceeds integer range".to_string()))
}

fn quantity_from_db(quantity: i32) -> Result<u32, StoreError> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::Database(format!("negative quantity in bookings row: {quantity}")))
}
