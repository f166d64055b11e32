//! The shared waiting queue
//!
//! A capacity-bounded pool of players keyed by user ID. All mutations take
//! the write half of a single `RwLock` over the whole membership set, so a
//! join can never interleave with a batch removal for a match.

use crate::error::{MatchmakingError, Result};
use crate::types::{PlayerId, QueueEntry, QueueStatus};
use crate::utils::current_timestamp;
use std::collections::VecDeque;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct QueueState {
    /// Entries in join order
    entries: VecDeque<QueueEntry>,
    /// Set once the queue reaches capacity, cleared when players are taken for a match
    is_full: bool,
}

impl QueueState {
    fn position(&self, user_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.user_id == user_id)
    }
}

/// Admission-controlled waiting pool
#[derive(Debug)]
pub struct MatchQueue {
    state: RwLock<QueueState>,
    capacity: usize,
}

impl MatchQueue {
    /// Create an empty queue admitting at most `capacity` players
    pub fn new(capacity: usize) -> Self {
        Self {
            state: RwLock::new(QueueState::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, QueueState>> {
        self.state
            .read()
            .map_err(|_| MatchmakingError::lock_poisoned("queue"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, QueueState>> {
        self.state
            .write()
            .map_err(|_| MatchmakingError::lock_poisoned("queue"))
    }

    /// Admit a player
    pub fn join(
        &self,
        user_id: impl Into<PlayerId>,
        display_name: impl Into<String>,
        skill_rating: i32,
    ) -> Result<QueueEntry> {
        let user_id = user_id.into();
        let display_name = display_name.into();
        let mut state = self.write()?;

        if state.position(&user_id).is_some() {
            return Err(MatchmakingError::AlreadyQueued { player_id: user_id });
        }

        if state.is_full || state.entries.len() >= self.capacity {
            state.is_full = true;
            return Err(MatchmakingError::QueueFull {
                capacity: self.capacity,
            });
        }

        let entry = QueueEntry {
            user_id,
            display_name,
            skill_rating,
            joined_at: current_timestamp(),
        };
        state.entries.push_back(entry.clone());

        if state.entries.len() >= self.capacity {
            state.is_full = true;
        }

        info!(
            "Player joined queue - player: '{}' ({}), rating: {}, size: {}/{}, full: {}",
            entry.display_name,
            entry.user_id,
            entry.skill_rating,
            state.entries.len(),
            self.capacity,
            state.is_full
        );

        Ok(entry)
    }

    /// Remove a player; absent players are not an error
    pub fn leave(&self, user_id: &str) -> Result<Option<QueueEntry>> {
        let mut state = self.write()?;

        let removed = state
            .position(user_id)
            .and_then(|idx| state.entries.remove(idx));

        if let Some(entry) = &removed {
            state.is_full = state.entries.len() >= self.capacity;
            info!(
                "Player left queue - player: '{}' ({}), size: {}/{}",
                entry.display_name,
                user_id,
                state.entries.len(),
                self.capacity
            );
        }

        Ok(removed)
    }

    /// Snapshot of the current queue
    pub fn status(&self) -> Result<QueueStatus> {
        let state = self.read()?;

        let count = state.entries.len();
        let can_start_match = count >= self.capacity;
        let estimated_wait = if state.is_full {
            "Queue is full - Match starting soon!".to_string()
        } else if count >= 1 {
            format!(
                "{} more players needed",
                self.capacity.saturating_sub(count)
            )
        } else {
            "Waiting for players...".to_string()
        };

        debug!(
            "Queue status - size: {}/{}, can_start: {}, full: {}",
            count, self.capacity, can_start_match, state.is_full
        );

        Ok(QueueStatus {
            count,
            players: state.entries.iter().cloned().collect(),
            capacity: self.capacity,
            is_queue_full: state.is_full,
            can_start_match,
            should_create_match: can_start_match,
            estimated_wait,
        })
    }

    /// Return up to `limit` entries in join order without removing them
    pub fn peek(&self, limit: usize) -> Result<Vec<QueueEntry>> {
        let state = self.read()?;
        Ok(state.entries.iter().take(limit).cloned().collect())
    }

    /// Atomically remove the given players and clear the full flag
    ///
    /// Returns the entries that were actually removed; IDs not in the queue
    /// are skipped.
    pub fn remove_many(&self, user_ids: &[PlayerId]) -> Result<Vec<QueueEntry>> {
        let mut state = self.write()?;

        let mut removed = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if let Some(entry) = state
                .position(user_id)
                .and_then(|idx| state.entries.remove(idx))
            {
                debug!(
                    "Removed from queue for match - player: '{}' ({})",
                    entry.display_name, entry.user_id
                );
                removed.push(entry);
            }
        }

        state.is_full = false;
        info!(
            "Queue reset after removal - removed: {}/{}, size: {}/{}",
            removed.len(),
            user_ids.len(),
            state.entries.len(),
            self.capacity
        );

        Ok(removed)
    }

    /// Remove exactly `count` players from the head of the queue, or nobody
    ///
    /// The size check and the removal happen under one write lock, so a
    /// concurrent leave can never leave a batch short.
    pub fn take_front(&self, count: usize) -> Result<Vec<QueueEntry>> {
        let mut state = self.write()?;

        let available = state.entries.len();
        if available < count {
            return Err(MatchmakingError::InsufficientPlayers {
                required: count,
                available,
            });
        }

        let taken: Vec<QueueEntry> = state.entries.drain(..count).collect();
        state.is_full = false;
        info!(
            "Took players from queue for match - taken: {}, size: {}/{}",
            taken.len(),
            state.entries.len(),
            self.capacity
        );

        Ok(taken)
    }

    /// Atomically empty the queue, returning how many players were dropped
    pub fn clear(&self) -> Result<usize> {
        let mut state = self.write()?;
        let dropped = state.entries.len();
        state.entries.clear();
        state.is_full = false;

        info!("Queue cleared - dropped {} players", dropped);
        Ok(dropped)
    }

    pub fn contains(&self, user_id: &str) -> Result<bool> {
        Ok(self.read()?.position(user_id).is_some())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.entries.is_empty())
    }
}
