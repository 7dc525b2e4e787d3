//! Shared state: the store actor and the loop state tracker

mod manager;
mod messages;
mod tracker;

pub use manager::StateManager;
pub use messages::{MarkOutcome, StateCommand, StateError, StateResponse};
pub use tracker::{LoopState, LoopTracker};
