//! Acceptance protocol for found matches
//!
//! Every roster player must accept before the acceptance window closes. A
//! decline or an expired window cancels the room and returns its players to
//! the queue.

pub mod coordinator;
pub mod sweeper;

pub use coordinator::{AcceptanceCoordinator, RollbackReport};
