//! `PostgreSQL` event catalog.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use stagepass_core::ports::{EventCatalog, StoreError};
use stagepass_core::types::{EventId, EventSnapshot, UserId};
use std::future::Future;
use std::pin::Pin;

/// Event lookups backed by `PostgreSQL`
#[derive(Clone, Debug)]
pub struct PostgresEventCatalog {
    pool: PgPool,
}

impl PostgresEventCatalog {
    /// Create a new catalog over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventCatalog for PostgresEventCatalog {
    fn event_by_id(
        &self,
        id: EventId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<EventSnapshot>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, name, date, cancelled, organizer_id, seat_plan, refund_policy
                FROM events
                WHERE id = $1
                ",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(to_db_error)?;
            row.as_ref().map(row_to_event).transpose()
        })
    }
}

fn row_to_event(row: &PgRow) -> Result<EventSnapshot, StoreError> {
    let seat_plan_json: serde_json::Value = row.try_get("seat_plan").map_err(to_db_error)?;
    let seat_plan =
        serde_json::from_value(seat_plan_json).map_err(|e| StoreError::Database(e.to_string()))?;

    let refund_policy_json: Option<serde_json::Value> =
        row.try_get("refund_policy").map_err(to_db_error)?;
    let refund_policy = refund_policy_json
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(EventSnapshot {
        id: EventId::from_uuid(row.try_get("id").map_err(to_db_error)?),
        name: row.try_get("name").map_err(to_db_error)?,
        date: row.try_get("date").map_err(to_db_error)?,
        cancelled: row.try_get("cancelled").map_err(to_db_error)?,
        organizer_id: UserId::from_uuid(row.try_get("organizer_id").map_err(to_db_error)?),
        seat_plan,
        refund_policy,
    })
}

fn to_db_error(error: sqlx::Error) -> StoreError {
    StoreError::Database(error.to_string())
}
