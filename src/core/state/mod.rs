// src/core/state/mod.rs

//! Defines the central `ServerState` struct and its persistence bookkeeping.

mod core;
mod persistence;

pub use self::core::{AddOutcome, Durability, FilterInfo, ServerState};
pub use persistence::PersistenceState;
