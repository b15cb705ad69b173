pub mod engine;
pub mod errors;
pub mod rng;
pub mod rules;
pub mod snapshot;
pub mod views;

#[cfg(test)]
mod property_tests;

pub use engine::{AvalonEngine, DefaultAvalonEngine, Transition};
pub use errors::{GameError, StateError};
pub use rng::{GameRandomness, OsRandomness, SeededRandomness};
pub use snapshot::{restore, snapshot};
pub use views::{known_info_for, player_view, PlayerView, PublicState};
