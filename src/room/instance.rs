//! Match room instance helpers
//!
//! Constructors and read-side queries on [`Match`]. State transitions live in
//! the captain and team modules and are applied by the room manager.

use crate::error::{MatchmakingError, Result};
use crate::types::{Match, MatchPlayer, MatchStatus, PlayerId, Team};
use crate::utils::{current_timestamp, generate_match_id, to_chrono};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

impl Match {
    /// Build a pending room for a roster whose acceptance window starts now
    pub fn new(players: Vec<MatchPlayer>, acceptance_window: Duration) -> Self {
        let now = current_timestamp();
        let expire_time = now
            .checked_add_signed(to_chrono(acceptance_window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            id: generate_match_id(),
            status: MatchStatus::Pending,
            players,
            team_a: Vec::new(),
            team_b: Vec::new(),
            captain1: None,
            captain2: None,
            captain_selection_method: None,
            captain_votes: HashMap::new(),
            captain_candidates: Vec::new(),
            selected_map: None,
            banned_maps: Vec::new(),
            winner: None,
            start_time: now,
            expire_time,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn player(&self, user_id: &str) -> Option<&MatchPlayer> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub(crate) fn player_mut(&mut self, user_id: &str) -> Option<&mut MatchPlayer> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn has_player(&self, user_id: &str) -> bool {
        self.player(user_id).is_some()
    }

    /// Roster IDs in roster order
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.user_id.clone()).collect()
    }

    pub fn accepted_count(&self) -> usize {
        self.players.iter().filter(|p| p.accepted).count()
    }

    pub fn all_accepted(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.accepted)
    }

    /// Active rooms still hold their roster
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_time
    }

    pub fn team(&self, team: Team) -> &[PlayerId] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }

    /// Captain leading `team`, once captains are known
    pub fn captain_of(&self, team: Team) -> Option<&PlayerId> {
        match team {
            Team::A => self.captain1.as_ref(),
            Team::B => self.captain2.as_ref(),
        }
    }

    pub fn unassigned_players(&self) -> impl Iterator<Item = &MatchPlayer> {
        self.players.iter().filter(|p| p.team.is_none())
    }

    pub fn all_players_assigned(&self) -> bool {
        self.players.iter().all(|p| p.team.is_some())
    }

    /// Fail with `WrongPhase` unless the room is in one of `expected`
    pub fn require_status(&self, expected: &[MatchStatus]) -> Result<()> {
        if expected.contains(&self.status) {
            return Ok(());
        }

        let expected = expected
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" or ");
        Err(MatchmakingError::WrongPhase {
            match_id: self.id,
            expected,
            actual: self.status,
        })
    }
}
