//! Shared waiting queue
//!
//! Players wait here until enough of them are present to fill a match room.

pub mod pool;

pub use pool::MatchQueue;
