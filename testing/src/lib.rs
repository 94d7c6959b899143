//! # Stagepass Testing
//!
//! In-memory doubles and fixtures for testing Stagepass services.
//!
//! This crate provides:
//! - Mock implementations of every engine port, with the same atomicity
//!   the real store promises
//! - Deterministic time pinned to a single well-known instant
//! - Builders for event fixtures
//!
//! ## Example
//!
//! ```ignore
//! use stagepass_testing::fixtures::EventBuilder;
//! use stagepass_testing::mocks::{InMemoryBookingStore, test_clock};
//!
//! #[tokio::test]
//! async fn reserves_two_seats() {
//!     let store = InMemoryBookingStore::new();
//!     let event = EventBuilder::new().flat(2500, 100).build();
//!     // wire the store and event into an Environment and drive a service
//! }
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::EventBuilder;
pub use mocks::{
    FixedClock, InMemoryBookingStore, InMemoryEventCatalog, InMemoryUserDirectory,
    RecordingGateway, RecordingNotifier, test_clock, test_now,
};

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a compact tracing subscriber for tests, once per process.
///
/// Honors `RUST_LOG`; defaults to `warn` so passing tests stay quiet.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
