//! Common types used throughout the matchmaking core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique identifier for players
pub type PlayerId = String;

/// Unique identifier for match rooms
pub type MatchId = Uuid;

/// A player waiting in the shared queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: PlayerId,
    pub display_name: String,
    pub skill_rating: i32,
    pub joined_at: DateTime<Utc>,
}

/// Snapshot of the queue, computed on demand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub count: usize,
    /// Entries in join order
    pub players: Vec<QueueEntry>,
    pub capacity: usize,
    pub is_queue_full: bool,
    pub can_start_match: bool,
    pub should_create_match: bool,
    pub estimated_wait: String,
}

/// Lifecycle of a match room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Waiting for every player to accept
    Pending,
    /// Everyone accepted
    Ready,
    CaptainSelection,
    CaptainVoting,
    TeamDraft,
    MapBan,
    Ongoing,
    Reporting,
    Completed,
    Disputed,
    /// Someone declined or the acceptance window expired
    Cancelled,
}

impl MatchStatus {
    /// Terminal rooms no longer hold their players
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Cancelled | MatchStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Ready => "ready",
            MatchStatus::CaptainSelection => "captain_selection",
            MatchStatus::CaptainVoting => "captain_voting",
            MatchStatus::TeamDraft => "team_draft",
            MatchStatus::MapBan => "map_ban",
            MatchStatus::Ongoing => "ongoing",
            MatchStatus::Reporting => "reporting",
            MatchStatus::Completed => "completed",
            MatchStatus::Disputed => "disputed",
            MatchStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the two captains are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptainSelectionMethod {
    Random,
    Voting,
}

impl std::fmt::Display for CaptainSelectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptainSelectionMethod::Random => write!(f, "random"),
            CaptainSelectionMethod::Voting => write!(f, "voting"),
        }
    }
}

impl std::str::FromStr for CaptainSelectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(CaptainSelectionMethod::Random),
            "voting" => Ok(CaptainSelectionMethod::Voting),
            other => Err(format!("Invalid captain selection method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    A,
    B,
}

impl Team {
    /// The opposing team
    pub fn other(self) -> Team {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerRole {
    Captain,
    Player,
}

/// A player bound to a match roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub user_id: PlayerId,
    pub display_name: String,
    pub skill_rating: i32,
    pub accepted: bool,
    pub team: Option<Team>,
    pub role: Option<PlayerRole>,
}

impl From<QueueEntry> for MatchPlayer {
    fn from(entry: QueueEntry) -> Self {
        Self {
            user_id: entry.user_id,
            display_name: entry.display_name,
            skill_rating: entry.skill_rating,
            accepted: false,
            team: None,
            role: None,
        }
    }
}

/// A match room and everything decided inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub status: MatchStatus,
    /// Roster, fixed at creation
    pub players: Vec<MatchPlayer>,
    pub team_a: Vec<PlayerId>,
    pub team_b: Vec<PlayerId>,
    pub captain1: Option<PlayerId>,
    pub captain2: Option<PlayerId>,
    pub captain_selection_method: Option<CaptainSelectionMethod>,
    /// voter -> candidate, one entry per voter
    pub captain_votes: HashMap<PlayerId, PlayerId>,
    pub captain_candidates: Vec<PlayerId>,
    pub selected_map: Option<String>,
    pub banned_maps: Vec<String>,
    pub winner: Option<Team>,
    pub start_time: DateTime<Utc>,
    pub expire_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a room was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Declined,
    Expired,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Declined => write!(f, "declined"),
            CancelReason::Expired => write!(f, "expired"),
        }
    }
}

/// Event emitted when a full queue is promoted into a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFound {
    pub match_id: MatchId,
    pub players: Vec<MatchPlayer>,
    pub expire_time: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when every roster player accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReady {
    pub match_id: MatchId,
    pub players: Vec<MatchPlayer>,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when a room is cancelled and its players requeued
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCancelled {
    pub match_id: MatchId,
    pub reason: CancelReason,
    /// Player who declined, if any
    pub cancelled_by: Option<PlayerId>,
    pub returned_to_queue: Vec<PlayerId>,
    pub failed_to_return: Vec<PlayerId>,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted once both captains are known
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptainsSelected {
    pub match_id: MatchId,
    pub method: CaptainSelectionMethod,
    pub captain1: PlayerId,
    pub captain2: PlayerId,
    pub timestamp: DateTime<Utc>,
}

/// Event emitted when every player is on a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamsFormed {
    pub match_id: MatchId,
    pub team_a: Vec<PlayerId>,
    pub team_b: Vec<PlayerId>,
    pub timestamp: DateTime<Utc>,
}

/// Union type for all lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchEvent {
    MatchFound(MatchFound),
    MatchReady(MatchReady),
    MatchCancelled(MatchCancelled),
    CaptainsSelected(CaptainsSelected),
    TeamsFormed(TeamsFormed),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&MatchStatus::CaptainVoting).unwrap();
        assert_eq!(json, "\"captain_voting\"");
        assert_eq!(MatchStatus::TeamDraft.to_string(), "team_draft");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(MatchStatus::Cancelled.is_terminal());
        assert!(MatchStatus::Completed.is_terminal());
        assert!(!MatchStatus::Pending.is_terminal());
        assert!(!MatchStatus::Disputed.is_terminal());
    }

    #[test]
    fn test_captain_method_parsing() {
        assert_eq!(
            "Voting".parse::<CaptainSelectionMethod>().unwrap(),
            CaptainSelectionMethod::Voting
        );
        assert!("coin-flip".parse::<CaptainSelectionMethod>().is_err());
    }

    #[test]
    fn test_event_tagging() {
        let event = MatchEvent::MatchReady(MatchReady {
            match_id: Uuid::new_v4(),
            players: Vec::new(),
            timestamp: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MatchReady");
    }
}
