//! Error types for the matchmaking core
//!
//! Every queue, room and acceptance operation returns a typed
//! [`MatchmakingError`] so request handlers can map each kind to their own
//! transport-level response.

use crate::types::{MatchId, MatchStatus, PlayerId};

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MatchmakingError>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Player already in queue: {player_id}")]
    AlreadyQueued { player_id: PlayerId },

    #[error("Queue is full ({capacity} players), please wait for the current match to start")]
    QueueFull { capacity: usize },

    #[error("Not enough players: need {required}, have {available}")]
    InsufficientPlayers { required: usize, available: usize },

    #[error("Match room not found: {match_id}")]
    MatchNotFound { match_id: MatchId },

    #[error("Player is not in any match room: {player_id}")]
    PlayerMatchNotFound { player_id: PlayerId },

    #[error("Match {match_id} is not pending (status: {status})")]
    NotPending { match_id: MatchId, status: MatchStatus },

    #[error("Match {match_id} is in {actual} phase, expected {expected}")]
    WrongPhase {
        match_id: MatchId,
        expected: String,
        actual: MatchStatus,
    },

    #[error("Player {player_id} is not in match {match_id}")]
    PlayerNotInMatch { match_id: MatchId, player_id: PlayerId },

    #[error("Voter {voter_id} is not in match {match_id}")]
    VoterNotInMatch { match_id: MatchId, voter_id: PlayerId },

    #[error("Invalid captain candidate {candidate_id} in match {match_id}")]
    InvalidCandidate {
        match_id: MatchId,
        candidate_id: PlayerId,
    },

    #[error("Acceptance window for match {match_id} has expired")]
    Expired { match_id: MatchId },

    #[error("Player {player_id} is already in active match {match_id}")]
    AlreadyInMatch { player_id: PlayerId, match_id: MatchId },

    #[error("Captain selection method already set for match {match_id}")]
    CaptainMethodAlreadySet { match_id: MatchId },

    #[error("It is not {captain_id}'s turn to pick in match {match_id}")]
    NotCaptainsTurn { match_id: MatchId, captain_id: PlayerId },

    #[error("Player {player_id} is already on a team in match {match_id}")]
    AlreadyDrafted { match_id: MatchId, player_id: PlayerId },

    #[error("Invalid room update for {match_id}: {reason}")]
    InvalidRoomUpdate { match_id: MatchId, reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    /// Whether this error means the requested room (or the player's room) does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MatchmakingError::MatchNotFound { .. } | MatchmakingError::PlayerMatchNotFound { .. }
        )
    }

    /// Shorthand for a poisoned lock
    pub(crate) fn lock_poisoned(what: &str) -> Self {
        MatchmakingError::InternalError {
            message: format!("Failed to acquire {} lock", what),
        }
    }
}
