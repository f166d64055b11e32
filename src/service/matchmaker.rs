//! The matchmaking coordinator
//!
//! [`Matchmaker`] is built once at startup and handed to every caller. It
//! owns the queue, the room manager and the acceptance coordinator, and
//! exposes the operations request handlers need.

use crate::acceptance::AcceptanceCoordinator;
use crate::config::MatchmakingSettings;
use crate::error::{MatchmakingError, Result};
use crate::events::{EventPublisher, TracingEventPublisher};
use crate::metrics::MetricsCollector;
use crate::queue::MatchQueue;
use crate::room::{MatchRoomManager, RoomManagerStats};
use crate::types::{CaptainSelectionMethod, Match, MatchId, QueueEntry, QueueStatus};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub entry: QueueEntry,
    /// Room created because this join filled the queue
    pub room: Option<Match>,
}

/// Single entry point to the matchmaking core
pub struct Matchmaker {
    settings: MatchmakingSettings,
    queue: Arc<MatchQueue>,
    rooms: Arc<MatchRoomManager>,
    acceptance: Arc<AcceptanceCoordinator>,
    metrics_collector: Arc<MetricsCollector>,
}

impl Matchmaker {
    /// Wire up the core with the given publisher and metrics
    pub fn new(
        settings: MatchmakingSettings,
        event_publisher: Arc<dyn EventPublisher>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        let queue = Arc::new(MatchQueue::new(settings.queue_capacity));
        let rooms = Arc::new(MatchRoomManager::with_metrics(
            queue.clone(),
            settings.clone(),
            event_publisher.clone(),
            metrics_collector.clone(),
        ));
        let acceptance = Arc::new(AcceptanceCoordinator::new(
            rooms.clone(),
            event_publisher,
            metrics_collector.clone(),
        ));

        info!(
            "Matchmaker ready - capacity: {}, acceptance window: {}ms, teams: {:?}, auto-create: {}",
            settings.queue_capacity,
            settings.acceptance_window_ms,
            settings.team_balancing,
            settings.auto_create_rooms
        );

        Self {
            settings,
            queue,
            rooms,
            acceptance,
            metrics_collector,
        }
    }

    /// Core that publishes events to the log
    pub fn with_tracing(
        settings: MatchmakingSettings,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self::new(
            settings,
            Arc::new(TracingEventPublisher::new()),
            metrics_collector,
        )
    }

    pub fn settings(&self) -> &MatchmakingSettings {
        &self.settings
    }

    pub fn queue(&self) -> &Arc<MatchQueue> {
        &self.queue
    }

    pub fn rooms(&self) -> &Arc<MatchRoomManager> {
        &self.rooms
    }

    pub fn acceptance(&self) -> &Arc<AcceptanceCoordinator> {
        &self.acceptance
    }

    /// Join the queue, creating a room if this join filled it and
    /// auto-creation is on
    pub async fn join_queue(
        &self,
        user_id: &str,
        display_name: &str,
        skill_rating: i32,
    ) -> Result<JoinOutcome> {
        let timer = self.metrics_collector.start_timer();
        let result = self.rooms.admit_player(user_id, display_name, skill_rating);

        let outcome = match &result {
            Ok(_) => "joined",
            Err(MatchmakingError::AlreadyQueued { .. }) => "already_queued",
            Err(MatchmakingError::QueueFull { .. }) => "queue_full",
            Err(MatchmakingError::AlreadyInMatch { .. }) => "already_in_match",
            Err(_) => "error",
        };
        self.metrics_collector
            .record_join(outcome, self.queue.len().unwrap_or_default());
        self.metrics_collector
            .record_operation("join_queue", timer.stop());

        let entry = result.map_err(|e| {
            warn!("Join rejected - player: {}, reason: {}", user_id, e);
            e
        })?;

        let room = match self.rooms.create_room_if_full().await {
            Ok(room) => room,
            Err(e) => {
                // The join itself succeeded
                warn!("Auto-create after join by {} failed: {}", user_id, e);
                None
            }
        };

        Ok(JoinOutcome { entry, room })
    }

    /// Leave the queue; returns whether the player was queued
    pub fn leave_queue(&self, user_id: &str) -> Result<bool> {
        let removed = self.queue.leave(user_id)?;
        self.metrics_collector
            .set_players_waiting(self.queue.len()?);
        Ok(removed.is_some())
    }

    pub fn queue_status(&self) -> Result<QueueStatus> {
        self.queue.status()
    }

    pub async fn create_room(&self) -> Result<Match> {
        self.rooms.create_room().await
    }

    pub fn get_room(&self, match_id: MatchId) -> Result<Match> {
        self.rooms.get_room(match_id)
    }

    pub fn get_room_for_player(&self, user_id: &str) -> Result<Match> {
        self.rooms.get_room_for_player(user_id)
    }

    pub fn list_active_rooms(&self) -> Result<Vec<Match>> {
        self.rooms.list_active_rooms()
    }

    pub async fn set_captain_selection_method(
        &self,
        match_id: MatchId,
        method: CaptainSelectionMethod,
    ) -> Result<Match> {
        self.rooms
            .set_captain_selection_method(match_id, method)
            .await
    }

    pub async fn vote_for_captain(
        &self,
        match_id: MatchId,
        voter_id: &str,
        candidate_id: &str,
    ) -> Result<Match> {
        self.rooms
            .vote_for_captain(match_id, voter_id, candidate_id)
            .await
    }

    pub async fn draft_pick(
        &self,
        match_id: MatchId,
        captain_id: &str,
        player_id: &str,
    ) -> Result<Match> {
        self.rooms.draft_pick(match_id, captain_id, player_id).await
    }

    pub async fn accept(&self, match_id: MatchId, user_id: &str) -> Result<Match> {
        self.acceptance.accept(match_id, user_id).await
    }

    pub async fn decline(&self, match_id: MatchId, user_id: &str) -> Result<Match> {
        self.acceptance.decline(match_id, user_id).await
    }

    pub fn stats(&self) -> Result<RoomManagerStats> {
        self.rooms.stats()
    }

    /// Start the expiry sweep if it is enabled
    pub fn start_expiry_sweep(&self) -> Option<JoinHandle<()>> {
        if !self.settings.enable_expiry_sweep {
            info!("Expiry sweep disabled - expired rooms are cancelled on next access");
            return None;
        }

        Some(self.acceptance.clone().start_sweep_task(
            self.settings.sweep_interval(),
            self.settings.room_retention(),
        ))
    }
}
