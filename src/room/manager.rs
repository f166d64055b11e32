//! Match room manager
//!
//! This module provides the [`MatchRoomManager`] that turns a full queue into
//! a match room, stores rooms, and funnels every room mutation through a
//! single atomic update path.
//!
//! Lock order is always rooms, then queue. The queue never calls back into
//! the manager, and no lock is held across an `.await`: events are published
//! after the store lock has been released. Queue operations called here are
//! single atomic units; the room lock only orders them against the roster
//! index.

use crate::config::MatchmakingSettings;
use crate::error::{MatchmakingError, Result};
use crate::events::EventPublisher;
use crate::metrics::MetricsCollector;
use crate::queue::MatchQueue;
use crate::room::captains::{self, CaptainOutcome};
use crate::room::teams;
use crate::types::{
    CaptainSelectionMethod, CaptainsSelected, Match, MatchFound, MatchId, MatchPlayer,
    MatchStatus, PlayerId, QueueEntry, TeamsFormed,
};
use crate::utils::{current_timestamp, to_chrono};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Statistics about room manager operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomManagerStats {
    /// Total number of rooms created
    pub rooms_created: u64,
    /// Total number of rooms where everyone accepted
    pub rooms_ready: u64,
    /// Total number of rooms cancelled by decline or expiry
    pub rooms_cancelled: u64,
    /// Total number of terminal rooms garbage-collected
    pub rooms_cleaned: u64,
    /// Total number of players put back in the queue after a cancellation
    pub players_returned: u64,
    /// Current number of active rooms
    pub active_rooms: usize,
    /// Current number of players waiting in the queue
    pub players_waiting: usize,
}

#[derive(Debug, Default)]
struct RoomStore {
    rooms: HashMap<MatchId, Match>,
    /// Roster members of active rooms only
    player_index: HashMap<PlayerId, MatchId>,
}

impl RoomStore {
    fn index(&mut self, room: &Match) {
        for player in &room.players {
            self.player_index.insert(player.user_id.clone(), room.id);
        }
    }

    fn unindex(&mut self, room: &Match) {
        for player in &room.players {
            if self.player_index.get(&player.user_id) == Some(&room.id) {
                self.player_index.remove(&player.user_id);
            }
        }
    }
}

/// Owner of every match room
pub struct MatchRoomManager {
    /// Rooms and the player index, under one lock
    store: RwLock<RoomStore>,
    /// Shared waiting queue that rooms are drawn from
    queue: Arc<MatchQueue>,
    /// Matchmaking settings
    settings: MatchmakingSettings,
    /// Event publisher for room events
    event_publisher: Arc<dyn EventPublisher>,
    /// Metrics collector for recording room activity
    metrics_collector: Arc<MetricsCollector>,
    /// Manager statistics
    stats: RwLock<RoomManagerStats>,
}

impl MatchRoomManager {
    /// Create a new room manager
    pub fn new(
        queue: Arc<MatchQueue>,
        settings: MatchmakingSettings,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|_| {
            warn!("Failed to create metrics collector, using default");
            MetricsCollector::default()
        }));

        Self::with_metrics(queue, settings, event_publisher, metrics_collector)
    }

    /// Create a new room manager with metrics collector
    pub fn with_metrics(
        queue: Arc<MatchQueue>,
        settings: MatchmakingSettings,
        event_publisher: Arc<dyn EventPublisher>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store: RwLock::new(RoomStore::default()),
            queue,
            settings,
            event_publisher,
            metrics_collector,
            stats: RwLock::new(RoomManagerStats::default()),
        }
    }

    pub fn queue(&self) -> &Arc<MatchQueue> {
        &self.queue
    }

    pub fn settings(&self) -> &MatchmakingSettings {
        &self.settings
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, RoomStore>> {
        self.store
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("rooms"))
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, RoomStore>> {
        self.store
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("rooms"))
    }

    fn with_stats(&self, f: impl FnOnce(&mut RoomManagerStats)) -> Result<()> {
        let mut stats = self
            .stats
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("stats"))?;
        f(&mut stats);
        Ok(())
    }

    /// Admit a player to the queue unless they are on an active room's roster
    ///
    /// The check and the queue insert run under the room lock, so a room
    /// cannot be created between them.
    pub fn admit_player(
        &self,
        user_id: impl Into<PlayerId>,
        display_name: impl Into<String>,
        skill_rating: i32,
    ) -> Result<QueueEntry> {
        let user_id = user_id.into();
        let store = self.read_store()?;

        if let Some(match_id) = store.player_index.get(&user_id) {
            return Err(MatchmakingError::AlreadyInMatch {
                player_id: user_id,
                match_id: *match_id,
            });
        }

        let entry = self.queue.join(user_id, display_name, skill_rating)?;
        drop(store);
        Ok(entry)
    }

    /// Promote the head of the queue into a pending room
    ///
    /// Exactly `capacity` players are taken in one queue operation, or none
    /// are and the queue is left untouched.
    pub async fn create_room(&self) -> Result<Match> {
        let timer = self.metrics_collector.start_timer();
        let required = self.queue.capacity();

        let (room, wait_times) = {
            // Held until the roster is indexed, so nobody taken here can be
            // readmitted by `admit_player` in between
            let mut store = self.write_store()?;

            let removed = self.queue.take_front(required).map_err(|e| {
                if let MatchmakingError::InsufficientPlayers { available, .. } = &e {
                    debug!(
                        "Not enough players for a room - need: {}, queued: {}",
                        required, available
                    );
                }
                e
            })?;

            let now = current_timestamp();
            let wait_times: Vec<Duration> = removed
                .iter()
                .map(|e| (now - e.joined_at).to_std().unwrap_or_default())
                .collect();

            let players: Vec<MatchPlayer> = removed.into_iter().map(MatchPlayer::from).collect();
            let room = Match::new(players, self.settings.acceptance_window());

            store.index(&room);
            store.rooms.insert(room.id, room.clone());
            (room, wait_times)
        };

        self.with_stats(|stats| stats.rooms_created += 1)?;
        self.metrics_collector
            .record_room_created(&wait_times, self.queue.len()?);
        self.metrics_collector
            .record_operation("create_room", timer.stop());

        info!(
            "Created match room {} - players: {:?}, expires: {}",
            room.id,
            room.player_ids(),
            room.expire_time
        );

        let event = MatchFound {
            match_id: room.id,
            players: room.players.clone(),
            expire_time: room.expire_time,
            timestamp: current_timestamp(),
        };
        if let Err(e) = self.event_publisher.publish_match_found(event).await {
            warn!("Failed to publish MatchFound for {}: {}", room.id, e);
        }

        Ok(room)
    }

    /// Create a room if auto-creation is on and the queue is at capacity
    ///
    /// Losing a race for the players is not an error.
    pub async fn create_room_if_full(&self) -> Result<Option<Match>> {
        if !self.settings.auto_create_rooms || self.queue.len()? < self.queue.capacity() {
            return Ok(None);
        }

        match self.create_room().await {
            Ok(room) => Ok(Some(room)),
            Err(MatchmakingError::InsufficientPlayers { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn get_room(&self, match_id: MatchId) -> Result<Match> {
        self.read_store()?
            .rooms
            .get(&match_id)
            .cloned()
            .ok_or(MatchmakingError::MatchNotFound { match_id })
    }

    /// The active room whose roster contains `user_id`
    pub fn get_room_for_player(&self, user_id: &str) -> Result<Match> {
        let store = self.read_store()?;

        store
            .player_index
            .get(user_id)
            .and_then(|match_id| store.rooms.get(match_id))
            .cloned()
            .ok_or_else(|| MatchmakingError::PlayerMatchNotFound {
                player_id: user_id.to_string(),
            })
    }

    /// Active rooms, oldest first
    pub fn list_active_rooms(&self) -> Result<Vec<Match>> {
        let store = self.read_store()?;

        let mut rooms: Vec<Match> = store
            .rooms
            .values()
            .filter(|room| room.is_active())
            .cloned()
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        Ok(rooms)
    }

    /// Replace a stored room wholesale, bumping `updated_at`
    pub fn replace_room(&self, room: Match) -> Result<Match> {
        let mut store = self.write_store()?;
        let current = store
            .rooms
            .get(&room.id)
            .ok_or(MatchmakingError::MatchNotFound { match_id: room.id })?;

        validate_update(current, &room)?;
        Ok(commit(&mut store, room))
    }

    /// Atomically read, modify and write one room
    ///
    /// `f` runs against a copy while the store is locked. The copy is stored
    /// only if `f` succeeds, so a failed mutation leaves no trace.
    pub fn update_room<F, T>(&self, match_id: MatchId, f: F) -> Result<(Match, T)>
    where
        F: FnOnce(&mut Match) -> Result<T>,
    {
        let mut store = self.write_store()?;
        let current = store
            .rooms
            .get(&match_id)
            .ok_or(MatchmakingError::MatchNotFound { match_id })?;

        let mut draft = current.clone();
        let output = f(&mut draft)?;
        validate_update(current, &draft)?;

        Ok((commit(&mut store, draft), output))
    }

    /// Choose how this room picks its captains
    pub async fn set_captain_selection_method(
        &self,
        match_id: MatchId,
        method: CaptainSelectionMethod,
    ) -> Result<Match> {
        let balancing = self.settings.team_balancing;
        let (room, outcome) =
            self.update_room(match_id, |room| captains::set_method(room, method, balancing))?;

        info!(
            "Captain selection method set - match: {}, method: {}, status: {}",
            match_id, method, room.status
        );

        if let Some(outcome) = outcome {
            self.announce_captains(&room, &outcome).await;
        }
        Ok(room)
    }

    /// Record a captain vote
    pub async fn vote_for_captain(
        &self,
        match_id: MatchId,
        voter_id: &str,
        candidate_id: &str,
    ) -> Result<Match> {
        let balancing = self.settings.team_balancing;
        let (room, outcome) = self.update_room(match_id, |room| {
            captains::cast_vote(room, voter_id, candidate_id, balancing)
        })?;

        debug!(
            "Captain vote recorded - match: {}, voter: {}, candidate: {}, votes: {}/{}",
            match_id,
            voter_id,
            candidate_id,
            room.captain_votes.len(),
            room.players.len()
        );

        if let Some(outcome) = outcome {
            self.announce_captains(&room, &outcome).await;
        }
        Ok(room)
    }

    /// A captain drafts a player onto their team
    pub async fn draft_pick(
        &self,
        match_id: MatchId,
        captain_id: &str,
        player_id: &str,
    ) -> Result<Match> {
        let (room, teams_formed) = self.update_room(match_id, |room| {
            teams::draft_pick(room, captain_id, player_id)
        })?;

        info!(
            "Draft pick - match: {}, captain: {}, picked: {}, teams: {}v{}",
            match_id,
            captain_id,
            player_id,
            room.team_a.len(),
            room.team_b.len()
        );

        if teams_formed {
            self.announce_teams(&room).await;
        }
        Ok(room)
    }

    async fn announce_captains(&self, room: &Match, outcome: &CaptainOutcome) {
        info!(
            "Captains selected - match: {}, method: {}, captain1: {}, captain2: {}",
            room.id, outcome.method, outcome.captain1, outcome.captain2
        );
        self.metrics_collector
            .record_captains_selected(outcome.method);

        let event = CaptainsSelected {
            match_id: room.id,
            method: outcome.method,
            captain1: outcome.captain1.clone(),
            captain2: outcome.captain2.clone(),
            timestamp: current_timestamp(),
        };
        if let Err(e) = self.event_publisher.publish_captains_selected(event).await {
            warn!("Failed to publish CaptainsSelected for {}: {}", room.id, e);
        }

        if outcome.teams_formed {
            self.announce_teams(room).await;
        }
    }

    async fn announce_teams(&self, room: &Match) {
        info!(
            "Teams formed - match: {}, team A: {:?}, team B: {:?}",
            room.id, room.team_a, room.team_b
        );
        self.metrics_collector
            .record_teams_formed(self.settings.team_balancing);

        let event = TeamsFormed {
            match_id: room.id,
            team_a: room.team_a.clone(),
            team_b: room.team_b.clone(),
            timestamp: current_timestamp(),
        };
        if let Err(e) = self.event_publisher.publish_teams_formed(event).await {
            warn!("Failed to publish TeamsFormed for {}: {}", room.id, e);
        }
    }

    /// Pending rooms whose acceptance window closed before `now`
    pub fn expired_pending_rooms(&self, now: DateTime<Utc>) -> Result<Vec<MatchId>> {
        let store = self.read_store()?;

        Ok(store
            .rooms
            .values()
            .filter(|room| room.status == MatchStatus::Pending && room.is_expired_at(now))
            .map(|room| room.id)
            .collect())
    }

    /// Drop terminal rooms not touched for longer than `retention`
    pub fn cleanup_terminal_rooms(&self, retention: Duration) -> Result<usize> {
        let Some(cutoff) = current_timestamp().checked_sub_signed(to_chrono(retention)) else {
            return Ok(0);
        };

        let removed = {
            let mut store = self.write_store()?;
            let before = store.rooms.len();
            store
                .rooms
                .retain(|_, room| room.is_active() || room.updated_at > cutoff);
            before - store.rooms.len()
        };

        if removed > 0 {
            self.with_stats(|stats| stats.rooms_cleaned += removed as u64)?;
            self.metrics_collector.record_rooms_cleaned(removed);
            info!("Cleaned up {} terminal match rooms", removed);
        }
        Ok(removed)
    }

    pub(crate) fn record_room_ready(&self) -> Result<()> {
        self.with_stats(|stats| stats.rooms_ready += 1)
    }

    pub(crate) fn record_room_cancelled(&self, players_returned: usize) -> Result<()> {
        self.with_stats(|stats| {
            stats.rooms_cancelled += 1;
            stats.players_returned += players_returned as u64;
        })
    }

    /// Get current manager statistics
    pub fn stats(&self) -> Result<RoomManagerStats> {
        let active_rooms = self
            .read_store()?
            .rooms
            .values()
            .filter(|room| room.is_active())
            .count();
        let players_waiting = self.queue.len()?;

        let mut stats = self
            .stats
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("stats"))?
            .clone();
        stats.active_rooms = active_rooms;
        stats.players_waiting = players_waiting;
        Ok(stats)
    }
}

/// Reject updates that touch what is fixed at creation
fn validate_update(current: &Match, updated: &Match) -> Result<()> {
    let invalid = |reason: &str| MatchmakingError::InvalidRoomUpdate {
        match_id: current.id,
        reason: reason.to_string(),
    };

    let same_roster = current.players.len() == updated.players.len()
        && current
            .players
            .iter()
            .zip(&updated.players)
            .all(|(a, b)| a.user_id == b.user_id);
    if !same_roster {
        return Err(invalid("roster is fixed once the room is created"));
    }
    if current.expire_time != updated.expire_time {
        return Err(invalid("expire time cannot change"));
    }
    if current.status.is_terminal() && !updated.status.is_terminal() {
        return Err(invalid("terminal rooms cannot be reopened"));
    }
    Ok(())
}

fn commit(store: &mut RoomStore, mut room: Match) -> Match {
    room.updated_at = current_timestamp();
    if room.status.is_terminal() {
        store.unindex(&room);
    }
    store.rooms.insert(room.id, room.clone());
    room
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TeamBalancing;
    use crate::events::RecordingEventPublisher;
    use crate::types::PlayerRole;

    fn create_test_manager(
        capacity: usize,
        balancing: TeamBalancing,
    ) -> (MatchRoomManager, Arc<RecordingEventPublisher>) {
        let mut settings = MatchmakingSettings::one_versus_one();
        settings.queue_capacity = capacity;
        settings.team_balancing = balancing;

        let publisher = Arc::new(RecordingEventPublisher::new());
        let manager = MatchRoomManager::new(
            Arc::new(MatchQueue::new(capacity)),
            settings,
            publisher.clone(),
        );
        (manager, publisher)
    }

    fn fill_queue(manager: &MatchRoomManager, count: usize) {
        for i in 1..=count {
            manager
                .admit_player(format!("u{}", i), format!("Player {}", i), 1000 + i as i32 * 10)
                .unwrap();
        }
    }

    async fn ready_room(manager: &MatchRoomManager) -> Match {
        let room = manager.create_room().await.unwrap();
        let (room, _) = manager
            .update_room(room.id, |room| {
                for player in room.players.iter_mut() {
                    player.accepted = true;
                }
                room.status = MatchStatus::Ready;
                Ok(())
            })
            .unwrap();
        room
    }

    #[tokio::test]
    async fn test_create_room_drains_queue() {
        let (manager, publisher) = create_test_manager(2, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 2);

        let room = manager.create_room().await.unwrap();
        assert_eq!(room.status, MatchStatus::Pending);
        assert_eq!(room.players.len(), 2);
        assert!(room.players.iter().all(|p| !p.accepted));
        assert_eq!(room.player_ids(), vec!["u1", "u2"]);
        assert!(manager.queue().is_empty().unwrap());

        assert_eq!(publisher.count_events_of_type("MatchFound"), 1);
        assert_eq!(manager.stats().unwrap().rooms_created, 1);
    }

    #[tokio::test]
    async fn test_create_room_insufficient_players() {
        let (manager, publisher) = create_test_manager(4, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 3);

        let err = manager.create_room().await.unwrap_err();
        assert_eq!(
            err,
            MatchmakingError::InsufficientPlayers {
                required: 4,
                available: 3
            }
        );
        assert_eq!(manager.queue().len().unwrap(), 3);
        assert_eq!(publisher.count_events_of_type("MatchFound"), 0);
    }

    #[tokio::test]
    async fn test_create_room_after_leave_keeps_queue_intact() {
        let (manager, publisher) = create_test_manager(3, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 3);
        manager.queue().leave("u2").unwrap();

        let err = manager.create_room().await.unwrap_err();
        assert_eq!(
            err,
            MatchmakingError::InsufficientPlayers {
                required: 3,
                available: 2
            }
        );

        let status = manager.queue().status().unwrap();
        let ids: Vec<_> = status.players.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u3"]);
        assert!(manager.list_active_rooms().unwrap().is_empty());
        assert_eq!(manager.stats().unwrap().rooms_created, 0);
        assert_eq!(publisher.count_events_of_type("MatchFound"), 0);
    }

    #[tokio::test]
    async fn test_get_room_and_player_index() {
        let (manager, _) = create_test_manager(2, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 2);
        let room = manager.create_room().await.unwrap();

        assert_eq!(manager.get_room(room.id).unwrap().id, room.id);
        assert_eq!(manager.get_room_for_player("u2").unwrap().id, room.id);
        assert!(manager.get_room_for_player("u9").unwrap_err().is_not_found());
        assert!(manager
            .get_room(crate::utils::generate_match_id())
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_player_in_active_room_cannot_requeue() {
        let (manager, _) = create_test_manager(2, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 2);
        let room = manager.create_room().await.unwrap();

        let err = manager.admit_player("u1", "Player 1", 1010).unwrap_err();
        assert_eq!(
            err,
            MatchmakingError::AlreadyInMatch {
                player_id: "u1".to_string(),
                match_id: room.id
            }
        );

        manager
            .update_room(room.id, |room| {
                room.status = MatchStatus::Cancelled;
                Ok(())
            })
            .unwrap();
        assert!(manager.get_room_for_player("u1").is_err());
        manager.admit_player("u1", "Player 1", 1010).unwrap();
    }

    #[tokio::test]
    async fn test_failed_update_leaves_no_trace() {
        let (manager, _) = create_test_manager(2, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 2);
        let room = manager.create_room().await.unwrap();

        let result: Result<(Match, ())> = manager.update_room(room.id, |room| {
            room.players[0].accepted = true;
            Err(MatchmakingError::Expired { match_id: room.id })
        });
        assert!(result.is_err());

        let stored = manager.get_room(room.id).unwrap();
        assert_eq!(stored.accepted_count(), 0);
        assert_eq!(stored.updated_at, room.updated_at);
    }

    #[tokio::test]
    async fn test_replace_room_rejects_roster_and_expiry_changes() {
        let (manager, _) = create_test_manager(2, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 2);
        let room = manager.create_room().await.unwrap();

        let mut shrunk = room.clone();
        shrunk.players.pop();
        assert!(matches!(
            manager.replace_room(shrunk),
            Err(MatchmakingError::InvalidRoomUpdate { .. })
        ));

        let mut extended = room.clone();
        extended.expire_time = extended.expire_time + chrono::Duration::seconds(30);
        assert!(matches!(
            manager.replace_room(extended),
            Err(MatchmakingError::InvalidRoomUpdate { .. })
        ));

        let mut accepted = room.clone();
        accepted.players[1].accepted = true;
        let stored = manager.replace_room(accepted).unwrap();
        assert_eq!(stored.accepted_count(), 1);
        assert!(stored.updated_at >= room.updated_at);
    }

    #[tokio::test]
    async fn test_random_captains_then_draft() {
        let (manager, publisher) = create_test_manager(4, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 4);
        let room = ready_room(&manager).await;

        let room = manager
            .set_captain_selection_method(room.id, CaptainSelectionMethod::Random)
            .await
            .unwrap();
        assert_eq!(room.status, MatchStatus::TeamDraft);
        assert_eq!(publisher.count_events_of_type("CaptainsSelected"), 1);

        let captain1 = room.captain1.clone().unwrap();
        let captain2 = room.captain2.clone().unwrap();
        let mut free: Vec<PlayerId> = room
            .players
            .iter()
            .filter(|p| p.role == Some(PlayerRole::Player))
            .map(|p| p.user_id.clone())
            .collect();

        let second = free.pop().unwrap();
        let first = free.pop().unwrap();
        manager.draft_pick(room.id, &captain1, &first).await.unwrap();
        let room = manager.draft_pick(room.id, &captain2, &second).await.unwrap();

        assert_eq!(room.status, MatchStatus::MapBan);
        assert_eq!(room.team_a, vec![captain1, first]);
        assert_eq!(room.team_b, vec![captain2, second]);
        assert_eq!(publisher.count_events_of_type("TeamsFormed"), 1);
    }

    #[tokio::test]
    async fn test_voting_tally_through_manager() {
        let (manager, publisher) = create_test_manager(4, TeamBalancing::SkillBalanced);
        fill_queue(&manager, 4);
        let room = ready_room(&manager).await;

        let room = manager
            .set_captain_selection_method(room.id, CaptainSelectionMethod::Voting)
            .await
            .unwrap();
        assert_eq!(room.status, MatchStatus::CaptainVoting);
        assert_eq!(room.captain_candidates.len(), 4);

        for (voter, candidate) in [("u1", "u3"), ("u2", "u4"), ("u3", "u3"), ("u4", "u4")] {
            manager
                .vote_for_captain(room.id, voter, candidate)
                .await
                .unwrap();
        }

        let room = manager.get_room(room.id).unwrap();
        assert_eq!(room.captain1.as_deref(), Some("u3"));
        assert_eq!(room.captain2.as_deref(), Some("u4"));
        // Skill balancing completes the teams straight away
        assert_eq!(room.status, MatchStatus::MapBan);
        assert_eq!(publisher.count_events_of_type("CaptainsSelected"), 1);
        assert_eq!(publisher.count_events_of_type("TeamsFormed"), 1);

        let err = manager
            .vote_for_captain(room.id, "u1", "u4")
            .await
            .unwrap_err();
        assert!(matches!(err, MatchmakingError::WrongPhase { .. }));
    }

    #[tokio::test]
    async fn test_cleanup_terminal_rooms() {
        let (manager, _) = create_test_manager(2, TeamBalancing::CaptainDraft);
        fill_queue(&manager, 2);
        let cancelled = manager.create_room().await.unwrap();
        manager
            .update_room(cancelled.id, |room| {
                room.status = MatchStatus::Cancelled;
                Ok(())
            })
            .unwrap();

        fill_queue(&manager, 2);
        let active = manager.create_room().await.unwrap();

        // Retention not yet elapsed
        assert_eq!(
            manager
                .cleanup_terminal_rooms(Duration::from_secs(300))
                .unwrap(),
            0
        );

        assert_eq!(manager.cleanup_terminal_rooms(Duration::ZERO).unwrap(), 1);
        assert!(manager.get_room(cancelled.id).is_err());
        assert!(manager.get_room(active.id).is_ok());
        assert_eq!(manager.list_active_rooms().unwrap().len(), 1);
        assert_eq!(manager.stats().unwrap().rooms_cleaned, 1);
    }

    #[tokio::test]
    async fn test_auto_create_only_when_full() {
        let (manager, _) = create_test_manager(2, TeamBalancing::CaptainDraft);
        manager.admit_player("u1", "Player 1", 1000).unwrap();
        assert!(manager.create_room_if_full().await.unwrap().is_none());

        manager.admit_player("u2", "Player 2", 1000).unwrap();
        let room = manager.create_room_if_full().await.unwrap();
        assert!(room.is_some());
        assert!(manager.queue().is_empty().unwrap());
    }
}
