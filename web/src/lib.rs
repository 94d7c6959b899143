//! HTTP API for the StagePass reservation engine.
//!
//! This crate is the imperative shell around `stagepass-engine`: Axum
//! handlers parse requests, call one engine operation, and map the outcome
//! (or its [`CoreError`](stagepass_core::CoreError)) onto an HTTP response.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract data** from the request (JSON body, path, query)
//! 3. **Call the workflow** on [`AppState`]
//! 4. **Map the result** to a response DTO, or the error to [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use stagepass_web::{build_router, AppState};
//! use stagepass_engine::Environment;
//!
//! let state = AppState::new(environment);
//! let app = build_router(state);
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
