//! `PostgreSQL` user directory.

use sqlx::PgPool;
use stagepass_core::ports::{StoreError, UserDirectory};
use stagepass_core::types::{Role, UserId};
use std::future::Future;
use std::pin::Pin;

/// Role lookups backed by `PostgreSQL`
#[derive(Clone, Debug)]
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    /// Create a new directory over the given connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserDirectory for PostgresUserDirectory {
    fn role_of(
        &self,
        id: UserId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Role>, StoreError>> + Send + '_>> {
        Box::pin(async move {
            let role: Option<String> =
                sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            role.map(|r| r.parse::<Role>().map_err(StoreError::Database))
                .transpose()
        })
    }
}
