//! Match rooms and their lifecycle
//!
//! A room is created in `pending` from a full queue. Once everyone accepts it
//! goes through captain selection and team formation before handing over to
//! map ban.

pub mod captains;
pub mod instance;
pub mod manager;
pub mod teams;

// Re-export commonly used types
pub use captains::CaptainOutcome;
pub use manager::{MatchRoomManager, RoomManagerStats};
