//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! scrim-room service, including environment variable and TOML loading
//! and validation.

use crate::config::matchmaking::{MatchmakingSettings, TeamBalancing};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub matchmaking: MatchmakingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "scrim-room".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

/// Parse an environment variable into `target` if it is set
fn parse_env<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<()> {
    if let Ok(value) = env::var(key) {
        *target = value
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", key, value))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // A profile sets the baseline; individual variables refine it
        if let Ok(profile) = env::var("MATCH_PROFILE") {
            config.matchmaking = MatchmakingSettings::profile(&profile)
                .ok_or_else(|| anyhow!("Invalid MATCH_PROFILE value: {}", profile))?;
        }

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        parse_env("HEALTH_PORT", &mut config.service.health_port)?;
        parse_env(
            "SHUTDOWN_TIMEOUT_SECONDS",
            &mut config.service.shutdown_timeout_seconds,
        )?;

        // Matchmaking settings
        let mm = &mut config.matchmaking;
        parse_env("QUEUE_CAPACITY", &mut mm.queue_capacity)?;
        parse_env("ACCEPTANCE_WINDOW_MS", &mut mm.acceptance_window_ms)?;
        if let Ok(balancing) = env::var("TEAM_BALANCING") {
            mm.team_balancing = balancing
                .parse::<TeamBalancing>()
                .map_err(|e| anyhow!(e))?;
        }
        parse_env("AUTO_CREATE_ROOMS", &mut mm.auto_create_rooms)?;
        parse_env("ENABLE_EXPIRY_SWEEP", &mut mm.enable_expiry_sweep)?;
        parse_env("SWEEP_INTERVAL_MS", &mut mm.sweep_interval_ms)?;
        parse_env("ROOM_RETENTION_SECONDS", &mut mm.room_retention_seconds)?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate matchmaking settings
    let mm = &config.matchmaking;
    if mm.queue_capacity < 2 {
        return Err(anyhow!(
            "Queue capacity must be at least 2 (got {})",
            mm.queue_capacity
        ));
    }
    if mm.acceptance_window_ms == 0 {
        return Err(anyhow!("Acceptance window must be greater than 0"));
    }
    if mm.enable_expiry_sweep && mm.sweep_interval_ms == 0 {
        return Err(anyhow!("Sweep interval must be greater than 0"));
    }

    Ok(())
}
