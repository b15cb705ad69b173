//! The full internal state of one Avalon game: the primitive-only shape that
//! is mutated by the engine and serialised for snapshotting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{GameId, MissionRecord, Phase, Player, RoomId, UserId, WinReason};
use crate::engine::avalon::StateError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub room_id: RoomId,
    /// Seating order, shuffled once at `initialize`.
    pub players: Vec<Player>,
    pub phase: Phase,
    pub current_round: u8,
    pub current_leader_index: usize,
    pub vote_track: u8,
    /// Length 5, one slot per round; `None` until that round resolves.
    pub mission_results: [Option<super::MissionOutcome>; 5],
    pub success_count: u8,
    pub fail_count: u8,
    pub proposed_team: Vec<UserId>,
    pub team_votes: BTreeMap<UserId, bool>,
    pub mission_votes: BTreeMap<UserId, bool>,
    pub mission_history: Vec<MissionRecord>,
    pub winner_team: Option<super::Team>,
    pub win_reason: Option<WinReason>,
    pub assassination_target: Option<UserId>,
}

impl GameState {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn current_leader(&self) -> &Player {
        &self.players[self.current_leader_index]
    }

    pub fn find_player(&self, user_id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_current_player(&self, user_id: UserId) -> bool {
        self.find_player(user_id).is_some()
    }

    pub fn advance_leader(&mut self) {
        let n = self.players.len();
        self.current_leader_index = (self.current_leader_index + 1) % n;
    }
}

/// Mirrors the teacher's `InvariantCheck` trait (`engine/nl/errors.rs`):
/// a cheap assertion runnable after every transition and before/after
/// snapshot restore.
pub trait InvariantCheck {
    fn validate_invariants(&self) -> Result<(), StateError>;
}

impl InvariantCheck for GameState {
    fn validate_invariants(&self) -> Result<(), StateError> {
        if self.phase == Phase::TeamSelection || self.phase == Phase::TeamVote {
            let completed_rounds = self.current_round.saturating_sub(1) as u16;
            if self.success_count as u16 + self.fail_count as u16 > completed_rounds {
                return Err(StateError::InvariantViolation(
                    "success_count + fail_count exceeds completed rounds",
                ));
            }
        }
        if self.success_count >= 3 && self.fail_count >= 3 {
            return Err(StateError::InvariantViolation(
                "both success_count and fail_count reached 3",
            ));
        }
        if self.vote_track > 5 {
            return Err(StateError::InvariantViolation("vote_track exceeds 5"));
        }
        if (self.winner_team.is_some()) != (self.phase == Phase::GameOver) {
            return Err(StateError::InvariantViolation(
                "winner_team set iff phase is game_over",
            ));
        }
        let non_null_results = self.mission_results.iter().filter(|r| r.is_some()).count();
        if non_null_results != self.mission_history.len() {
            return Err(StateError::InvariantViolation(
                "mission_results entries do not match mission_history length",
            ));
        }
        Ok(())
    }
}
