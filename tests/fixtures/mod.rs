//! Test fixtures shared by the integration and concurrency tests

#![allow(dead_code)]

use async_trait::async_trait;
use scrim_room::config::{MatchmakingSettings, TeamBalancing};
use scrim_room::error::{MatchmakingError, Result};
use scrim_room::events::{EventPublisher, RecordingEventPublisher};
use scrim_room::metrics::MetricsCollector;
use scrim_room::service::Matchmaker;
use scrim_room::types::{
    CaptainsSelected, Match, MatchCancelled, MatchFound, MatchReady, TeamsFormed,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Publisher whose every publish fails, counting the attempts
#[derive(Debug, Default)]
pub struct FailingEventPublisher {
    attempts: AtomicUsize,
}

impl FailingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(MatchmakingError::InternalError {
            message: "event sink unavailable".to_string(),
        })
    }
}

#[async_trait]
impl EventPublisher for FailingEventPublisher {
    async fn publish_match_found(&self, _event: MatchFound) -> Result<()> {
        self.fail()
    }

    async fn publish_match_ready(&self, _event: MatchReady) -> Result<()> {
        self.fail()
    }

    async fn publish_match_cancelled(&self, _event: MatchCancelled) -> Result<()> {
        self.fail()
    }

    async fn publish_captains_selected(&self, _event: CaptainsSelected) -> Result<()> {
        self.fail()
    }

    async fn publish_teams_formed(&self, _event: TeamsFormed) -> Result<()> {
        self.fail()
    }
}

/// Settings for a room of `capacity` players with manual room creation
pub fn settings(capacity: usize) -> MatchmakingSettings {
    MatchmakingSettings {
        queue_capacity: capacity,
        auto_create_rooms: false,
        enable_expiry_sweep: false,
        ..MatchmakingSettings::five_versus_five()
    }
}

/// Same as [`settings`] with the given acceptance window
pub fn settings_with_window(capacity: usize, window_ms: u64) -> MatchmakingSettings {
    MatchmakingSettings {
        acceptance_window_ms: window_ms,
        ..settings(capacity)
    }
}

pub fn skill_balanced(capacity: usize) -> MatchmakingSettings {
    MatchmakingSettings {
        team_balancing: TeamBalancing::SkillBalanced,
        ..settings(capacity)
    }
}

/// A matchmaker wired to a recording publisher
pub struct TestSystem {
    pub matchmaker: Arc<Matchmaker>,
    pub events: Arc<RecordingEventPublisher>,
    pub metrics: Arc<MetricsCollector>,
}

impl TestSystem {
    pub fn new(settings: MatchmakingSettings) -> Self {
        let events = Arc::new(RecordingEventPublisher::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let matchmaker = Arc::new(Matchmaker::new(
            settings,
            events.clone(),
            metrics.clone(),
        ));

        Self {
            matchmaker,
            events,
            metrics,
        }
    }

    /// Queue `count` players named `{prefix}{i}` with ratings 1000, 1100, ...
    pub async fn queue_players(&self, prefix: &str, count: usize) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let user_id = format!("{}{}", prefix, i);
            self.matchmaker
                .join_queue(&user_id, &format!("Name {}", user_id), 1000 + 100 * i as i32)
                .await
                .unwrap();
            ids.push(user_id);
        }
        ids
    }

    /// Fill the queue and create a pending room from it
    pub async fn pending_room(&self) -> Match {
        let capacity = self.matchmaker.settings().queue_capacity;
        self.queue_players("p", capacity).await;
        self.matchmaker.create_room().await.unwrap()
    }

    /// Fill the queue, create a room and have everyone accept it
    pub async fn ready_room(&self) -> Match {
        let room = self.pending_room().await;
        let mut current = room.clone();
        for user_id in room.player_ids() {
            current = self.matchmaker.accept(room.id, &user_id).await.unwrap();
        }
        current
    }
}
