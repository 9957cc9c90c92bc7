//! HTTP entry point of the messaging pipeline.
//!
//! `POST /api/messages` only appends to the create topic; the storage and
//! search workers pick it up from there. The read endpoints page through a
//! conversation from the record store, or through search hits hydrated from
//! the record store.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use error::{AppError, AppResult};
pub use state::AppState;
