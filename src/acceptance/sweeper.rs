//! Background expiry sweep
//!
//! Expiry is otherwise only noticed when someone touches the room again.
//! The sweep cancels abandoned pending rooms on an interval through the same
//! path as a decline, and garbage-collects terminal rooms past retention.
//! Each tick also opens a room for a queue left full with auto-creation on.

use crate::acceptance::AcceptanceCoordinator;
use crate::error::Result;
use crate::utils::current_timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

impl AcceptanceCoordinator {
    /// Cancel every pending room whose acceptance window has closed
    pub async fn sweep_expired(&self) -> Result<usize> {
        let expired = self.rooms().expired_pending_rooms(current_timestamp())?;
        if expired.is_empty() {
            return Ok(0);
        }

        debug!("Expiry sweep found {} candidate rooms", expired.len());

        let mut cancelled = 0;
        for match_id in expired {
            if self.expire_room(match_id).await? {
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            info!("Expiry sweep cancelled {} rooms", cancelled);
        }
        Ok(cancelled)
    }

    /// Spawn the periodic expiry sweep
    pub fn start_sweep_task(
        self: Arc<Self>,
        sweep_interval: Duration,
        retention: Duration,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(&self);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);

            loop {
                interval.tick().await;

                if let Err(e) = coordinator.sweep_expired().await {
                    error!("Error during expiry sweep: {}", e);
                }
                if let Err(e) = coordinator.rooms().cleanup_terminal_rooms(retention) {
                    error!("Error during room cleanup: {}", e);
                }
                if let Err(e) = coordinator.rooms().create_room_if_full().await {
                    error!("Error during auto room creation: {}", e);
                }
            }
        });

        info!(
            "Started expiry sweep task - interval: {}ms, retention: {}s",
            sweep_interval.as_millis(),
            retention.as_secs()
        );
        handle
    }
}
