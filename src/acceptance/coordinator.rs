//! Accept/decline protocol for pending rooms
//!
//! The coordinator holds no lock of its own. Every room change goes through
//! [`MatchRoomManager::update_room`], and returning players to the queue
//! happens after the cancellation has been committed.

use crate::error::{MatchmakingError, Result};
use crate::events::EventPublisher;
use crate::metrics::MetricsCollector;
use crate::queue::MatchQueue;
use crate::room::MatchRoomManager;
use crate::types::{
    CancelReason, Match, MatchCancelled, MatchId, MatchReady, MatchStatus, PlayerId,
};
use crate::utils::current_timestamp;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What an accept did to the room
enum AcceptOutcome {
    Accepted { ready: bool },
    Expired,
}

/// Players the rollback managed (or failed) to put back in the queue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackReport {
    pub returned: Vec<PlayerId>,
    pub failed: Vec<PlayerId>,
}

/// Drives `pending -> ready` and `pending -> cancelled`
pub struct AcceptanceCoordinator {
    rooms: Arc<MatchRoomManager>,
    queue: Arc<MatchQueue>,
    event_publisher: Arc<dyn EventPublisher>,
    metrics_collector: Arc<MetricsCollector>,
}

impl AcceptanceCoordinator {
    pub fn new(
        rooms: Arc<MatchRoomManager>,
        event_publisher: Arc<dyn EventPublisher>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        let queue = Arc::clone(rooms.queue());
        Self {
            rooms,
            queue,
            event_publisher,
            metrics_collector,
        }
    }

    pub fn rooms(&self) -> &Arc<MatchRoomManager> {
        &self.rooms
    }

    /// Accept a found match on behalf of `user_id`
    ///
    /// If the acceptance window has already closed the room is cancelled,
    /// its players go back to the queue and the caller gets `Expired`.
    pub async fn accept(&self, match_id: MatchId, user_id: &str) -> Result<Match> {
        let timer = self.metrics_collector.start_timer();
        let now = current_timestamp();

        let (room, outcome) = self.rooms.update_room(match_id, |room| {
            if room.status == MatchStatus::Pending && room.is_expired_at(now) {
                room.status = MatchStatus::Cancelled;
                return Ok(AcceptOutcome::Expired);
            }
            if room.status != MatchStatus::Pending {
                return Err(MatchmakingError::NotPending {
                    match_id: room.id,
                    status: room.status,
                });
            }

            let match_id = room.id;
            let player =
                room.player_mut(user_id)
                    .ok_or_else(|| MatchmakingError::PlayerNotInMatch {
                        match_id,
                        player_id: user_id.to_string(),
                    })?;
            player.accepted = true;

            let ready = room.all_accepted();
            if ready {
                room.status = MatchStatus::Ready;
            }
            Ok(AcceptOutcome::Accepted { ready })
        })?;

        self.metrics_collector
            .record_operation("accept", timer.stop());

        match outcome {
            AcceptOutcome::Expired => {
                warn!(
                    "Accept after acceptance window closed - match: {}, player: {}",
                    match_id, user_id
                );
                self.finish_cancellation(&room, CancelReason::Expired, None)
                    .await;
                Err(MatchmakingError::Expired { match_id })
            }
            AcceptOutcome::Accepted { ready } => {
                info!(
                    "Player accepted match - match: {}, player: {}, accepted: {}/{}",
                    match_id,
                    user_id,
                    room.accepted_count(),
                    room.players.len()
                );
                if ready {
                    self.announce_ready(&room).await;
                }
                Ok(room)
            }
        }
    }

    /// Decline a found match, cancelling it for everyone
    ///
    /// Every roster player, including the one who declined, is put back in
    /// the queue with their original name and rating.
    pub async fn decline(&self, match_id: MatchId, user_id: &str) -> Result<Match> {
        let timer = self.metrics_collector.start_timer();
        let now = current_timestamp();

        let (room, reason) = self.rooms.update_room(match_id, |room| {
            if room.status != MatchStatus::Pending {
                return Err(MatchmakingError::NotPending {
                    match_id: room.id,
                    status: room.status,
                });
            }
            if room.is_expired_at(now) {
                room.status = MatchStatus::Cancelled;
                return Ok(CancelReason::Expired);
            }
            if !room.has_player(user_id) {
                return Err(MatchmakingError::PlayerNotInMatch {
                    match_id: room.id,
                    player_id: user_id.to_string(),
                });
            }

            room.status = MatchStatus::Cancelled;
            Ok(CancelReason::Declined)
        })?;

        self.metrics_collector
            .record_operation("decline", timer.stop());

        match reason {
            CancelReason::Expired => {
                self.finish_cancellation(&room, CancelReason::Expired, None)
                    .await;
                Err(MatchmakingError::Expired { match_id })
            }
            CancelReason::Declined => {
                info!("Player declined match - match: {}, player: {}", match_id, user_id);
                self.finish_cancellation(
                    &room,
                    CancelReason::Declined,
                    Some(user_id.to_string()),
                )
                .await;
                Ok(room)
            }
        }
    }

    /// Cancel a pending room whose window has closed
    ///
    /// Returns false when the room was no longer pending or not yet expired,
    /// e.g. because the last accept won the race.
    pub async fn expire_room(&self, match_id: MatchId) -> Result<bool> {
        let now = current_timestamp();

        let result = self.rooms.update_room(match_id, |room| {
            if room.status != MatchStatus::Pending || !room.is_expired_at(now) {
                return Err(MatchmakingError::NotPending {
                    match_id: room.id,
                    status: room.status,
                });
            }
            room.status = MatchStatus::Cancelled;
            Ok(())
        });

        match result {
            Ok((room, ())) => {
                info!("Match {} expired before everyone accepted", match_id);
                self.finish_cancellation(&room, CancelReason::Expired, None)
                    .await;
                Ok(true)
            }
            Err(MatchmakingError::NotPending { .. })
            | Err(MatchmakingError::MatchNotFound { .. }) => {
                debug!("Skipping expiry of match {}, no longer pending", match_id);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Return the roster to the queue, report the cancellation, then open a
    /// new room if the queue is full again and auto-creation is on
    ///
    /// A player that cannot rejoin is logged and skipped; the rest still get
    /// their attempt.
    async fn finish_cancellation(
        &self,
        room: &Match,
        reason: CancelReason,
        cancelled_by: Option<PlayerId>,
    ) -> RollbackReport {
        let mut report = RollbackReport::default();

        for player in &room.players {
            match self.queue.join(
                player.user_id.clone(),
                player.display_name.clone(),
                player.skill_rating,
            ) {
                Ok(_) => report.returned.push(player.user_id.clone()),
                Err(e) => {
                    warn!(
                        "Failed to return player '{}' ({}) to queue after match {} was cancelled: {}",
                        player.display_name, player.user_id, room.id, e
                    );
                    report.failed.push(player.user_id.clone());
                }
            }
        }

        if let Err(e) = self.rooms.record_room_cancelled(report.returned.len()) {
            warn!("Failed to update room stats: {}", e);
        }
        self.metrics_collector.record_room_cancelled(
            reason,
            report.returned.len(),
            report.failed.len(),
        );
        if let Ok(size) = self.queue.len() {
            self.metrics_collector.set_players_waiting(size);
        }

        info!(
            "Match {} cancelled ({}) - requeued: {}, not requeued: {}",
            room.id,
            reason,
            report.returned.len(),
            report.failed.len()
        );

        let event = MatchCancelled {
            match_id: room.id,
            reason,
            cancelled_by,
            returned_to_queue: report.returned.clone(),
            failed_to_return: report.failed.clone(),
            timestamp: current_timestamp(),
        };
        if let Err(e) = self.event_publisher.publish_match_cancelled(event).await {
            warn!("Failed to publish MatchCancelled for {}: {}", room.id, e);
        }

        // A full roster coming back refills the queue, and no later join can
        // get in to trigger creation
        match self.rooms.create_room_if_full().await {
            Ok(Some(next)) => info!(
                "Returned players filled the queue - match {} created after {} was cancelled",
                next.id, room.id
            ),
            Ok(None) => {}
            Err(e) => warn!("Auto-create after match {} was cancelled failed: {}", room.id, e),
        }

        report
    }

    async fn announce_ready(&self, room: &Match) {
        info!("All players accepted match {}, room is ready", room.id);

        if let Err(e) = self.rooms.record_room_ready() {
            warn!("Failed to update room stats: {}", e);
        }
        self.metrics_collector.record_room_ready();

        let event = MatchReady {
            match_id: room.id,
            players: room.players.clone(),
            timestamp: current_timestamp(),
        };
        if let Err(e) = self.event_publisher.publish_match_ready(event).await {
            warn!("Failed to publish MatchReady for {}: {}", room.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchmakingSettings;
    use crate::events::RecordingEventPublisher;
    use std::time::Duration;

    struct Harness {
        coordinator: AcceptanceCoordinator,
        rooms: Arc<MatchRoomManager>,
        queue: Arc<MatchQueue>,
        publisher: Arc<RecordingEventPublisher>,
    }

    fn harness(window: Duration) -> Harness {
        let mut settings = MatchmakingSettings::one_versus_one();
        settings.acceptance_window_ms = window.as_millis() as u64;
        settings.auto_create_rooms = false;

        let queue = Arc::new(MatchQueue::new(settings.queue_capacity));
        let publisher = Arc::new(RecordingEventPublisher::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let rooms = Arc::new(MatchRoomManager::with_metrics(
            queue.clone(),
            settings,
            publisher.clone(),
            metrics.clone(),
        ));
        let coordinator = AcceptanceCoordinator::new(rooms.clone(), publisher.clone(), metrics);

        Harness {
            coordinator,
            rooms,
            queue,
            publisher,
        }
    }

    async fn pending_room(h: &Harness) -> Match {
        h.rooms.admit_player("u1", "Alice", 1200).unwrap();
        h.rooms.admit_player("u2", "Bob", 1300).unwrap();
        h.rooms.create_room().await.unwrap()
    }

    #[tokio::test]
    async fn test_all_accept_makes_room_ready() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;

        let after_first = h.coordinator.accept(room.id, "u1").await.unwrap();
        assert_eq!(after_first.status, MatchStatus::Pending);
        assert_eq!(h.publisher.count_events_of_type("MatchReady"), 0);

        let after_second = h.coordinator.accept(room.id, "u2").await.unwrap();
        assert_eq!(after_second.status, MatchStatus::Ready);
        assert!(after_second.players.iter().all(|p| p.accepted));
        assert_eq!(h.publisher.count_events_of_type("MatchReady"), 1);
        assert_eq!(h.rooms.stats().unwrap().rooms_ready, 1);
    }

    #[tokio::test]
    async fn test_accept_twice_is_harmless() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;

        h.coordinator.accept(room.id, "u1").await.unwrap();
        let room = h.coordinator.accept(room.id, "u1").await.unwrap();
        assert_eq!(room.accepted_count(), 1);
        assert_eq!(room.status, MatchStatus::Pending);
    }

    #[tokio::test]
    async fn test_accept_errors() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;

        let err = h
            .coordinator
            .accept(crate::utils::generate_match_id(), "u1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = h.coordinator.accept(room.id, "u9").await.unwrap_err();
        assert!(matches!(err, MatchmakingError::PlayerNotInMatch { .. }));

        h.coordinator.accept(room.id, "u1").await.unwrap();
        h.coordinator.accept(room.id, "u2").await.unwrap();
        let err = h.coordinator.accept(room.id, "u1").await.unwrap_err();
        assert_eq!(
            err,
            MatchmakingError::NotPending {
                match_id: room.id,
                status: MatchStatus::Ready
            }
        );
    }

    #[tokio::test]
    async fn test_decline_requeues_everyone() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;
        h.coordinator.accept(room.id, "u1").await.unwrap();

        let room = h.coordinator.decline(room.id, "u2").await.unwrap();
        assert_eq!(room.status, MatchStatus::Cancelled);

        let status = h.queue.status().unwrap();
        assert_eq!(status.count, 2);
        let alice = status.players.iter().find(|e| e.user_id == "u1").unwrap();
        assert_eq!(alice.display_name, "Alice");
        assert_eq!(alice.skill_rating, 1200);

        match h.publisher.events().last() {
            Some(crate::types::MatchEvent::MatchCancelled(event)) => {
                assert_eq!(event.reason, CancelReason::Declined);
                assert_eq!(event.cancelled_by.as_deref(), Some("u2"));
                assert_eq!(event.returned_to_queue.len(), 2);
                assert!(event.failed_to_return.is_empty());
            }
            other => panic!("expected MatchCancelled, got {:?}", other),
        }

        // The room no longer holds its players
        assert!(h.rooms.get_room_for_player("u1").is_err());
    }

    #[tokio::test]
    async fn test_decline_recreates_room_when_auto_create_is_on() {
        let mut settings = MatchmakingSettings::one_versus_one();
        settings.auto_create_rooms = true;

        let queue = Arc::new(MatchQueue::new(settings.queue_capacity));
        let publisher = Arc::new(RecordingEventPublisher::new());
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let rooms = Arc::new(MatchRoomManager::with_metrics(
            queue.clone(),
            settings,
            publisher.clone(),
            metrics.clone(),
        ));
        let coordinator = AcceptanceCoordinator::new(rooms.clone(), publisher.clone(), metrics);

        rooms.admit_player("u1", "Alice", 1200).unwrap();
        rooms.admit_player("u2", "Bob", 1300).unwrap();
        let room = rooms.create_room().await.unwrap();

        coordinator.decline(room.id, "u2").await.unwrap();

        let next = rooms.get_room_for_player("u1").unwrap();
        assert_ne!(next.id, room.id);
        assert_eq!(next.status, MatchStatus::Pending);
        assert!(queue.is_empty().unwrap());
        assert_eq!(publisher.count_events_of_type("MatchFound"), 2);
        assert!(matches!(
            publisher.events().last(),
            Some(crate::types::MatchEvent::MatchFound(_))
        ));
    }

    #[tokio::test]
    async fn test_decline_after_ready_is_rejected() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;
        h.coordinator.accept(room.id, "u1").await.unwrap();
        h.coordinator.accept(room.id, "u2").await.unwrap();

        let err = h.coordinator.decline(room.id, "u1").await.unwrap_err();
        assert!(matches!(err, MatchmakingError::NotPending { .. }));
        assert!(h.queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_decline_by_stranger_changes_nothing() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;

        let err = h.coordinator.decline(room.id, "u9").await.unwrap_err();
        assert!(matches!(err, MatchmakingError::PlayerNotInMatch { .. }));
        assert_eq!(
            h.rooms.get_room(room.id).unwrap().status,
            MatchStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_rollback_continues_past_failures() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;

        // Someone else grabs a slot while the room is pending
        h.rooms.admit_player("u3", "Carol", 1100).unwrap();

        h.coordinator.decline(room.id, "u1").await.unwrap();

        match h.publisher.events().last() {
            Some(crate::types::MatchEvent::MatchCancelled(event)) => {
                assert_eq!(event.returned_to_queue, vec!["u1".to_string()]);
                assert_eq!(event.failed_to_return, vec!["u2".to_string()]);
            }
            other => panic!("expected MatchCancelled, got {:?}", other),
        }
        assert_eq!(h.queue.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_accept_after_expiry_cancels_room() {
        let h = harness(Duration::from_millis(20));
        let room = pending_room(&h).await;
        h.coordinator.accept(room.id, "u1").await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        let err = h.coordinator.accept(room.id, "u2").await.unwrap_err();
        assert_eq!(err, MatchmakingError::Expired { match_id: room.id });
        assert_eq!(
            h.rooms.get_room(room.id).unwrap().status,
            MatchStatus::Cancelled
        );
        assert_eq!(h.queue.len().unwrap(), 2);
        assert_eq!(h.publisher.count_events_of_type("MatchCancelled"), 1);
    }

    #[tokio::test]
    async fn test_decline_after_expiry_reports_expired() {
        let h = harness(Duration::from_millis(20));
        let room = pending_room(&h).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        let err = h.coordinator.decline(room.id, "u2").await.unwrap_err();
        assert_eq!(err, MatchmakingError::Expired { match_id: room.id });
        assert_eq!(h.queue.len().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expire_room_skips_live_rooms() {
        let h = harness(Duration::from_secs(15));
        let room = pending_room(&h).await;

        assert!(!h.coordinator.expire_room(room.id).await.unwrap());
        assert!(!h
            .coordinator
            .expire_room(crate::utils::generate_match_id())
            .await
            .unwrap());
        assert_eq!(
            h.rooms.get_room(room.id).unwrap().status,
            MatchStatus::Pending
        );
    }
}
