//! `PostgreSQL`-backed ports for the Stagepass engine.
//!
//! This crate implements the store-side ports from `stagepass-core` over
//! sqlx with runtime-checked queries:
//!
//! - [`PostgresBookingStore`]: bookings, with the guarded insert and the
//!   conditional verify/cancel updates
//! - [`PostgresEventCatalog`]: event snapshots
//! - [`PostgresUserDirectory`]: user roles
//!
//! # Example
//!
//! ```ignore
//! use stagepass_store::{PostgresBookingStore, connect, run_migrations};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/stagepass", 5).await?;
//!     run_migrations(&pool).await?;
//!     let store = PostgresBookingStore::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod directory;
pub mod postgres;

pub use catalog::PostgresEventCatalog;
pub use directory::PostgresUserDirectory;
pub use postgres::PostgresBookingStore;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use stagepass_core::ports::StoreError;

/// Open a connection pool against the given database.
///
/// # Errors
///
/// Returns [`StoreError::Database`] when the database cannot be reached.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))
}

/// Bring the schema up to date.
///
/// # Errors
///
/// Returns [`StoreError::Database`] when a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))
}
