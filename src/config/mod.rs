//! Configuration management for the scrim-room service
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and deployment profiles.

pub mod app;
pub mod matchmaking;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ServiceSettings};
pub use matchmaking::{MatchmakingSettings, TeamBalancing};
