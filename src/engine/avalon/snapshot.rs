//! Snapshot / restore: serialises the full internal `GameState` to a
//! primitive-only JSON shape and reconstructs it identically, as required by
//! §4.B. Restoration validates invariants before handing the state back;
//! per §7, a snapshot that fails that check is discarded rather than
//! trusted.

use serde_json::Value;

use crate::domain::{GameState, InvariantCheck};

use super::errors::GameError;

pub fn snapshot(state: &GameState) -> Result<Value, GameError> {
    serde_json::to_value(state).map_err(|e| GameError::validation(format!("snapshot failed: {e}")))
}

pub fn restore(value: Value) -> Result<GameState, GameError> {
    let state: GameState = serde_json::from_value(value)
        .map_err(|e| GameError::validation(format!("restore failed: {e}")))?;
    state
        .validate_invariants()
        .map_err(|e| GameError::validation(format!("restored snapshot failed invariants: {e:?}")))?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawPlayer;
    use crate::engine::avalon::engine::{AvalonEngine, DefaultAvalonEngine};
    use crate::engine::avalon::rng::SeededRandomness;

    #[test]
    fn round_trips_through_json() {
        let engine = DefaultAvalonEngine;
        let mut rng = SeededRandomness::new(9);
        let players: Vec<RawPlayer> = (0..6)
            .map(|i| RawPlayer {
                user_id: i,
                username: format!("u{i}"),
                display_name: format!("U{i}"),
            })
            .collect();
        let state = engine
            .initialize("g1".into(), "r1".into(), players, &mut rng)
            .unwrap();

        let snap = snapshot(&state).unwrap();
        let restored = restore(snap).unwrap();
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            serde_json::to_string(&restored).unwrap()
        );
    }
}
