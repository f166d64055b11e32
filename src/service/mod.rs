//! Service layer for the scrim-room matchmaking service
//!
//! This module contains the matchmaking facade, the main application state,
//! and health reporting for the production service.

pub mod app;
pub mod health;
pub mod matchmaker;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use matchmaker::{JoinOutcome, Matchmaker};
