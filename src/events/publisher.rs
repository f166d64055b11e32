//! Lifecycle event publishing
//!
//! Events are published after the state change they describe has been
//! committed and after every lock has been released.

use crate::error::Result;
use crate::types::*;
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// Trait for publishing match lifecycle events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a MatchFound event
    async fn publish_match_found(&self, event: MatchFound) -> Result<()>;

    /// Publish a MatchReady event
    async fn publish_match_ready(&self, event: MatchReady) -> Result<()>;

    /// Publish a MatchCancelled event
    async fn publish_match_cancelled(&self, event: MatchCancelled) -> Result<()>;

    /// Publish a CaptainsSelected event
    async fn publish_captains_selected(&self, event: CaptainsSelected) -> Result<()>;

    /// Publish a TeamsFormed event
    async fn publish_teams_formed(&self, event: TeamsFormed) -> Result<()>;
}

/// Publisher that writes every event to the structured log
#[derive(Debug, Default, Clone)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish_match_found(&self, event: MatchFound) -> Result<()> {
        info!(
            "MatchFound - match: {}, players: {}, expires: {}",
            event.match_id,
            event.players.len(),
            event.expire_time
        );
        Ok(())
    }

    async fn publish_match_ready(&self, event: MatchReady) -> Result<()> {
        info!(
            "MatchReady - match: {}, players: {}",
            event.match_id,
            event.players.len()
        );
        Ok(())
    }

    async fn publish_match_cancelled(&self, event: MatchCancelled) -> Result<()> {
        info!(
            "MatchCancelled - match: {}, reason: {}, by: {:?}, requeued: {}, not requeued: {}",
            event.match_id,
            event.reason,
            event.cancelled_by,
            event.returned_to_queue.len(),
            event.failed_to_return.len()
        );
        Ok(())
    }

    async fn publish_captains_selected(&self, event: CaptainsSelected) -> Result<()> {
        info!(
            "CaptainsSelected - match: {}, method: {}, captains: {} and {}",
            event.match_id, event.method, event.captain1, event.captain2
        );
        Ok(())
    }

    async fn publish_teams_formed(&self, event: TeamsFormed) -> Result<()> {
        info!(
            "TeamsFormed - match: {}, team A: {:?}, team B: {:?}",
            event.match_id, event.team_a, event.team_b
        );
        Ok(())
    }
}

/// Publisher that keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    published_events: Mutex<Vec<MatchEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all published events
    pub fn events(&self) -> Vec<MatchEvent> {
        self.published_events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Count events of a specific type, e.g. "MatchReady"
    pub fn count_events_of_type(&self, event_type: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event_name(event) == event_type)
            .count()
    }

    pub fn clear_events(&self) {
        if let Ok(mut events) = self.published_events.lock() {
            events.clear();
        }
    }

    fn record(&self, event: MatchEvent) {
        if let Ok(mut events) = self.published_events.lock() {
            events.push(event);
        }
    }
}

/// Name of the event variant, matching its serialized `type` tag
pub fn event_name(event: &MatchEvent) -> &'static str {
    match event {
        MatchEvent::MatchFound(_) => "MatchFound",
        MatchEvent::MatchReady(_) => "MatchReady",
        MatchEvent::MatchCancelled(_) => "MatchCancelled",
        MatchEvent::CaptainsSelected(_) => "CaptainsSelected",
        MatchEvent::TeamsFormed(_) => "TeamsFormed",
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish_match_found(&self, event: MatchFound) -> Result<()> {
        self.record(MatchEvent::MatchFound(event));
        Ok(())
    }

    async fn publish_match_ready(&self, event: MatchReady) -> Result<()> {
        self.record(MatchEvent::MatchReady(event));
        Ok(())
    }

    async fn publish_match_cancelled(&self, event: MatchCancelled) -> Result<()> {
        self.record(MatchEvent::MatchCancelled(event));
        Ok(())
    }

    async fn publish_captains_selected(&self, event: CaptainsSelected) -> Result<()> {
        self.record(MatchEvent::CaptainsSelected(event));
        Ok(())
    }

    async fn publish_teams_formed(&self, event: TeamsFormed) -> Result<()> {
        self.record(MatchEvent::TeamsFormed(event));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{current_timestamp, generate_match_id};

    #[tokio::test]
    async fn test_recording_publisher() {
        let publisher = RecordingEventPublisher::new();
        let match_id = generate_match_id();

        publisher
            .publish_match_ready(MatchReady {
                match_id,
                players: Vec::new(),
                timestamp: current_timestamp(),
            })
            .await
            .unwrap();
        publisher
            .publish_match_cancelled(MatchCancelled {
                match_id,
                reason: CancelReason::Declined,
                cancelled_by: Some("u2".to_string()),
                returned_to_queue: vec!["u1".to_string(), "u2".to_string()],
                failed_to_return: Vec::new(),
                timestamp: current_timestamp(),
            })
            .await
            .unwrap();

        assert_eq!(publisher.count_events_of_type("MatchReady"), 1);
        assert_eq!(publisher.count_events_of_type("MatchCancelled"), 1);
        assert_eq!(publisher.count_events_of_type("MatchFound"), 0);

        publisher.clear_events();
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn test_tracing_publisher_never_fails() {
        let publisher = TracingEventPublisher::new();
        let result = publisher
            .publish_captains_selected(CaptainsSelected {
                match_id: generate_match_id(),
                method: CaptainSelectionMethod::Random,
                captain1: "u1".to_string(),
                captain2: "u2".to_string(),
                timestamp: current_timestamp(),
            })
            .await;
        assert!(result.is_ok());
    }
}
