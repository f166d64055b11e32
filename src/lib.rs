//! Scrim Room - matchmaking core for team scrimmages
//!
//! This crate provides a bounded player queue, match rooms that move
//! through acceptance, captain selection, team formation and map banning,
//! and the acceptance protocol that returns players to the queue when a
//! room falls through.

pub mod acceptance;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod queue;
pub mod room;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use acceptance::AcceptanceCoordinator;
pub use events::{EventPublisher, RecordingEventPublisher, TracingEventPublisher};
pub use queue::MatchQueue;
pub use room::MatchRoomManager;
pub use service::Matchmaker;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
