//! Precondition validators, one free function per operation, returning
//! `Result<(), GameError>`. Mirrors `ledger/lobby/validation.rs`'s style of
//! small, composable guard functions invoked at the top of each operation.

use std::collections::BTreeSet;

use crate::domain::{GameState, Phase, Team, UserId};
use crate::rulebook;

use super::errors::GameError;

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Night => "night",
        Phase::TeamSelection => "team_selection",
        Phase::TeamVote => "team_vote",
        Phase::Mission => "mission",
        Phase::Assassination => "assassination",
        Phase::GameOver => "game_over",
    }
}

fn require_phase(state: &GameState, expected: Phase) -> Result<(), GameError> {
    if state.phase != expected {
        return Err(GameError::WrongPhase {
            expected: phase_name(expected),
            actual: phase_name(state.phase),
        });
    }
    Ok(())
}

pub fn validate_initialize(player_count: usize) -> Result<(), GameError> {
    if !(rulebook::MIN_PLAYERS..=rulebook::MAX_PLAYERS).contains(&player_count) {
        return Err(GameError::Capacity {
            got: player_count,
            min: rulebook::MIN_PLAYERS,
            max: rulebook::MAX_PLAYERS,
        });
    }
    Ok(())
}

pub fn validate_propose_team(
    state: &GameState,
    leader_id: UserId,
    members: &[UserId],
) -> Result<(), GameError> {
    require_phase(state, Phase::TeamSelection)?;
    if state.current_leader().user_id != leader_id {
        return Err(GameError::Unauthorized("sender is not the current leader"));
    }
    let required = rulebook::team_size(state.player_count(), state.current_round)
        .ok_or(GameError::NotFound("team size for this round"))?;
    if members.len() != required as usize {
        return Err(GameError::RuleViolation("wrong team size"));
    }
    let unique: BTreeSet<UserId> = members.iter().copied().collect();
    if unique.len() != members.len() {
        return Err(GameError::RuleViolation("duplicate team members"));
    }
    for member in members {
        if !state.is_current_player(*member) {
            return Err(GameError::Validation(format!(
                "{member} is not a player in this game"
            )));
        }
    }
    Ok(())
}

pub fn validate_vote_team(state: &GameState, player_id: UserId) -> Result<(), GameError> {
    require_phase(state, Phase::TeamVote)?;
    if !state.is_current_player(player_id) {
        return Err(GameError::Unauthorized("sender is not a player in this game"));
    }
    if state.team_votes.contains_key(&player_id) {
        return Err(GameError::DoubleAction("player has already voted on this team"));
    }
    Ok(())
}

pub fn validate_vote_mission(
    state: &GameState,
    player_id: UserId,
    success: bool,
) -> Result<(), GameError> {
    require_phase(state, Phase::Mission)?;
    if !state.proposed_team.contains(&player_id) {
        return Err(GameError::Unauthorized("sender is not on the mission team"));
    }
    if state.mission_votes.contains_key(&player_id) {
        return Err(GameError::DoubleAction("player has already voted on this mission"));
    }
    let player = state
        .find_player(player_id)
        .ok_or(GameError::NotFound("player"))?;
    if player.team == Team::Good && !success {
        return Err(GameError::RuleViolation("good players must vote success"));
    }
    Ok(())
}

pub fn validate_assassinate(
    state: &GameState,
    assassin_id: UserId,
    target_id: UserId,
) -> Result<(), GameError> {
    require_phase(state, Phase::Assassination)?;
    let assassin = state
        .find_player(assassin_id)
        .ok_or(GameError::Unauthorized("sender is not a player in this game"))?;
    if assassin.role != crate::domain::Role::Assassin {
        return Err(GameError::Unauthorized("sender is not the assassin"));
    }
    let target = state
        .find_player(target_id)
        .ok_or(GameError::Validation(format!(
            "{target_id} is not a player in this game"
        )))?;
    if target.team != Team::Good {
        return Err(GameError::RuleViolation("assassination target must be on the good team"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::avalon::engine::{AvalonEngine, DefaultAvalonEngine};
    use crate::engine::avalon::rng::SeededRandomness;
    use crate::domain::RawPlayer;

    fn sample_players(n: usize) -> Vec<RawPlayer> {
        (0..n)
            .map(|i| RawPlayer {
                user_id: i as i64,
                username: format!("user{i}"),
                display_name: format!("User {i}"),
            })
            .collect()
    }

    #[test]
    fn propose_team_rejects_wrong_size() {
        let mut rng = SeededRandomness::new(1);
        let state = DefaultAvalonEngine
            .initialize("g1".into(), "r1".into(), sample_players(5), &mut rng)
            .unwrap();
        let leader = state.current_leader().user_id;
        let err = validate_propose_team(&state, leader, &[0, 1, 2]).unwrap_err();
        assert_eq!(err, GameError::RuleViolation("wrong team size"));
    }
}
