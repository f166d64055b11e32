//! Matchmaking configuration
//!
//! Queue capacity and team formation are deployment parameters rather than
//! separate code paths: a 1v1 test deployment and a 5v5 production
//! deployment run the same core with different settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How players end up on teams once both captains are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamBalancing {
    /// Captains pick players one at a time
    CaptainDraft,
    /// Remaining players are split by skill rating without a draft
    SkillBalanced,
}

impl std::str::FromStr for TeamBalancing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "captain_draft" | "draft" => Ok(TeamBalancing::CaptainDraft),
            "skill_balanced" | "balanced" => Ok(TeamBalancing::SkillBalanced),
            other => Err(format!("Invalid team balancing strategy: {}", other)),
        }
    }
}

/// Matchmaking-specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchmakingSettings {
    /// Players per match; the queue refuses joins beyond this
    pub queue_capacity: usize,
    /// How long players have to accept a found match
    pub acceptance_window_ms: u64,
    /// Team formation strategy after captain selection
    pub team_balancing: TeamBalancing,
    /// Create a room as soon as a join fills the queue
    pub auto_create_rooms: bool,
    /// Proactively cancel expired rooms instead of waiting for the next accept/decline
    pub enable_expiry_sweep: bool,
    /// Expiry sweep interval in milliseconds
    pub sweep_interval_ms: u64,
    /// How long cancelled/completed rooms stay queryable
    pub room_retention_seconds: u64,
}

impl MatchmakingSettings {
    /// Ten players, two teams of five
    pub fn five_versus_five() -> Self {
        Self {
            queue_capacity: 10,
            acceptance_window_ms: 15_000,
            team_balancing: TeamBalancing::CaptainDraft,
            auto_create_rooms: true,
            enable_expiry_sweep: true,
            sweep_interval_ms: 1_000,
            room_retention_seconds: 300,
        }
    }

    /// Two players, used for test deployments
    pub fn one_versus_one() -> Self {
        Self {
            queue_capacity: 2,
            ..Self::five_versus_five()
        }
    }

    /// Look up a named profile
    pub fn profile(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "5v5" | "five_versus_five" | "production" => Some(Self::five_versus_five()),
            "1v1" | "one_versus_one" | "test" => Some(Self::one_versus_one()),
            _ => None,
        }
    }

    pub fn acceptance_window(&self) -> Duration {
        Duration::from_millis(self.acceptance_window_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn room_retention(&self) -> Duration {
        Duration::from_secs(self.room_retention_seconds)
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self::five_versus_five()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        assert_eq!(MatchmakingSettings::five_versus_five().queue_capacity, 10);
        assert_eq!(MatchmakingSettings::one_versus_one().queue_capacity, 2);
        assert_eq!(
            MatchmakingSettings::one_versus_one().acceptance_window(),
            Duration::from_secs(15)
        );
        assert_eq!(
            MatchmakingSettings::profile("1v1").map(|s| s.queue_capacity),
            Some(2)
        );
        assert!(MatchmakingSettings::profile("3v3").is_none());
    }

    #[test]
    fn test_team_balancing_parsing() {
        assert_eq!(
            "skill_balanced".parse::<TeamBalancing>().unwrap(),
            TeamBalancing::SkillBalanced
        );
        assert_eq!(
            "Draft".parse::<TeamBalancing>().unwrap(),
            TeamBalancing::CaptainDraft
        );
        assert!("snake".parse::<TeamBalancing>().is_err());
    }
}
