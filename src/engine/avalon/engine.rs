//! Pure state-machine operations. Mirrors the shape of the teacher's
//! `BettingEngineNL` trait: a zero-sized engine type implementing a trait of
//! free operations over an externally-owned, serialisable state struct, each
//! returning a `Transition` describing what the caller should broadcast.

use std::collections::BTreeMap;

use crate::domain::{
    GameState, InvariantCheck, MissionOutcome, MissionRecord, Phase, RawPlayer, Role, Team,
    UserId, WinReason,
};
use crate::rulebook;

use super::errors::GameError;
use super::rng::GameRandomness;
use super::views::{player_view, PlayerView};

/// Describes the broadcast-worthy outcome of one operation. The caller
/// already owns the mutated `GameState`; `Transition` only carries the
/// discriminant and the extra data a dispatcher cannot cheaply re-derive.
#[derive(Debug, Clone)]
pub enum Transition {
    TeamProposed,
    /// A vote was recorded but the tally is not yet complete.
    VoteRecorded,
    TeamVoteResolved { approved: bool },
    MissionResolved { record: MissionRecord },
    Assassinated { winner: Team, reason: WinReason },
}

pub trait AvalonEngine {
    fn initialize(
        &self,
        game_id: String,
        room_id: String,
        players: Vec<RawPlayer>,
        rng: &mut dyn GameRandomness,
    ) -> Result<GameState, GameError>;

    fn propose_team(
        &self,
        state: &mut GameState,
        leader_id: UserId,
        members: Vec<UserId>,
    ) -> Result<Transition, GameError>;

    fn vote_team(
        &self,
        state: &mut GameState,
        player_id: UserId,
        approve: bool,
    ) -> Result<Transition, GameError>;

    fn vote_mission(
        &self,
        state: &mut GameState,
        player_id: UserId,
        success: bool,
        rng: &mut dyn GameRandomness,
    ) -> Result<Transition, GameError>;

    fn assassinate(
        &self,
        state: &mut GameState,
        assassin_id: UserId,
        target_id: UserId,
    ) -> Result<Transition, GameError>;

    fn get_player_view(&self, state: &GameState, user_id: UserId) -> Option<PlayerView>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAvalonEngine;

impl AvalonEngine for DefaultAvalonEngine {
    fn initialize(
        &self,
        game_id: String,
        room_id: String,
        mut players: Vec<RawPlayer>,
        rng: &mut dyn GameRandomness,
    ) -> Result<GameState, GameError> {
        super::rules::validate_initialize(players.len())?;
        let n = players.len();

        rng.shuffle(&mut players);

        let (good, evil) = rulebook::role_composition(n).expect("validated player count");
        let mut roles: Vec<Role> = good.into_iter().chain(evil).collect();
        rng.shuffle(&mut roles);

        let assigned: Vec<_> = players
            .into_iter()
            .zip(roles)
            .map(|(raw, role)| crate::domain::Player {
                user_id: raw.user_id,
                username: raw.username,
                display_name: raw.display_name,
                team: role.team(),
                role,
            })
            .collect();

        let leader_index = rng.gen_range(n);

        let state = GameState {
            game_id,
            room_id,
            players: assigned,
            phase: Phase::TeamSelection,
            current_round: 1,
            current_leader_index: leader_index,
            vote_track: 0,
            mission_results: [None, None, None, None, None],
            success_count: 0,
            fail_count: 0,
            proposed_team: Vec::new(),
            team_votes: BTreeMap::new(),
            mission_votes: BTreeMap::new(),
            mission_history: Vec::new(),
            winner_team: None,
            win_reason: None,
            assassination_target: None,
        };
        state
            .validate_invariants()
            .map_err(|e| GameError::Validation(format!("{e:?}")))?;
        Ok(state)
    }

    fn propose_team(
        &self,
        state: &mut GameState,
        leader_id: UserId,
        members: Vec<UserId>,
    ) -> Result<Transition, GameError> {
        super::rules::validate_propose_team(state, leader_id, &members)?;
        state.proposed_team = members;
        state.team_votes.clear();
        state.phase = Phase::TeamVote;
        Ok(Transition::TeamProposed)
    }

    fn vote_team(
        &self,
        state: &mut GameState,
        player_id: UserId,
        approve: bool,
    ) -> Result<Transition, GameError> {
        super::rules::validate_vote_team(state, player_id)?;
        state.team_votes.insert(player_id, approve);

        if state.team_votes.len() < state.player_count() {
            return Ok(Transition::VoteRecorded);
        }

        let approvals = state.team_votes.values().filter(|v| **v).count();
        let rejections = state.team_votes.len() - approvals;
        let approved = approvals > rejections;

        if approved {
            state.phase = Phase::Mission;
            state.mission_votes.clear();
            state.vote_track = 0;
        } else {
            state.vote_track += 1;
            if state.vote_track >= 5 {
                state.phase = Phase::GameOver;
                state.winner_team = Some(Team::Evil);
                state.win_reason = Some(WinReason::FiveRejections);
            } else {
                state.advance_leader();
                state.proposed_team.clear();
                state.team_votes.clear();
                state.phase = Phase::TeamSelection;
            }
        }

        state
            .validate_invariants()
            .map_err(|e| GameError::Validation(format!("{e:?}")))?;
        Ok(Transition::TeamVoteResolved { approved })
    }

    fn vote_mission(
        &self,
        state: &mut GameState,
        player_id: UserId,
        success: bool,
        rng: &mut dyn GameRandomness,
    ) -> Result<Transition, GameError> {
        super::rules::validate_vote_mission(state, player_id, success)?;
        state.mission_votes.insert(player_id, success);

        if state.mission_votes.len() < state.proposed_team.len() {
            return Ok(Transition::VoteRecorded);
        }

        // Capture the resolving leader before any leader advance below: see
        // the design-note resolution for the pre-advance-leader ambiguity.
        let resolving_leader_id = state.current_leader().user_id;

        let fails = state.mission_votes.values().filter(|v| !**v).count() as u8;
        let required_fails =
            rulebook::fail_requirement(state.player_count(), state.current_round)
                .ok_or(GameError::NotFound("fail requirement for this round"))?;
        let mission_failed = fails >= required_fails;
        let outcome = if mission_failed {
            MissionOutcome::Fail
        } else {
            MissionOutcome::Success
        };

        let mut shuffled_votes: Vec<bool> = state.mission_votes.values().copied().collect();
        rng.shuffle(&mut shuffled_votes);

        let record = MissionRecord {
            round: state.current_round,
            team_size: state.proposed_team.len() as u8,
            leader_id: resolving_leader_id,
            team: state.proposed_team.clone(),
            team_votes: state.team_votes.clone(),
            mission_votes: shuffled_votes,
            outcome,
        };
        state.mission_results[(state.current_round - 1) as usize] = Some(outcome);
        state.mission_history.push(record.clone());

        if mission_failed {
            state.fail_count += 1;
        } else {
            state.success_count += 1;
        }

        if state.success_count >= 3 {
            state.phase = Phase::Assassination;
        } else if state.fail_count >= 3 {
            state.phase = Phase::GameOver;
            state.winner_team = Some(Team::Evil);
            state.win_reason = Some(WinReason::ThreeFailedMissions);
        } else {
            state.current_round += 1;
            state.advance_leader();
            state.proposed_team.clear();
            state.team_votes.clear();
            state.mission_votes.clear();
            state.vote_track = 0;
            state.phase = Phase::TeamSelection;
        }

        state
            .validate_invariants()
            .map_err(|e| GameError::Validation(format!("{e:?}")))?;
        Ok(Transition::MissionResolved { record })
    }

    fn assassinate(
        &self,
        state: &mut GameState,
        assassin_id: UserId,
        target_id: UserId,
    ) -> Result<Transition, GameError> {
        super::rules::validate_assassinate(state, assassin_id, target_id)?;
        state.assassination_target = Some(target_id);

        let target_role = state.find_player(target_id).expect("validated target").role;
        let (winner, reason) = if target_role == Role::Merlin {
            (Team::Evil, WinReason::MerlinAssassinated)
        } else {
            (Team::Good, WinReason::MerlinSurvived)
        };
        state.winner_team = Some(winner);
        state.win_reason = Some(reason);
        state.phase = Phase::GameOver;

        state
            .validate_invariants()
            .map_err(|e| GameError::Validation(format!("{e:?}")))?;
        Ok(Transition::Assassinated { winner, reason })
    }

    fn get_player_view(&self, state: &GameState, user_id: UserId) -> Option<PlayerView> {
        player_view(state, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawPlayer;
    use crate::engine::avalon::rng::SeededRandomness;

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
    fn initialize_assigns_exact_role_composition() {
        let engine = DefaultAvalonEngine;
        for n in rulebook::MIN_PLAYERS..=rulebook::MAX_PLAYERS {
            let mut rng = SeededRandomness::new(n as u64);
            let state = engine
                .initialize(format!("g{n}"), "r1".into(), sample_players(n), &mut rng)
                .unwrap();
            assert_eq!(state.players.len(), n);
            let evil = state.players.iter().filter(|p| p.team == Team::Evil).count();
            assert_eq!(evil, rulebook::evil_count(n).unwrap() as usize);
            assert_eq!(state.phase, Phase::TeamSelection);
            assert_eq!(state.current_round, 1);
        }
    }

    #[test]
    fn initialize_rejects_out_of_range_player_count() {
        let engine = DefaultAvalonEngine;
        let mut rng = SeededRandomness::new(1);
        let err = engine
            .initialize("g1".into(), "r1".into(), sample_players(4), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::Capacity { got: 4, min: 5, max: 10 }
        );
    }

    #[test]
    fn scenario_fastest_evil_win_by_rejections() {
        let engine = DefaultAvalonEngine;
        let mut rng = SeededRandomness::new(42);
        let mut state = engine
            .initialize("g1".into(), "r1".into(), sample_players(5), &mut rng)
            .unwrap();

        for _ in 0..5 {
            let leader = state.current_leader().user_id;
            let others: Vec<UserId> = state
                .players
                .iter()
                .map(|p| p.user_id)
                .filter(|id| *id != leader)
                .take(1)
                .collect();
            let members = vec![leader, others[0]];
            engine.propose_team(&mut state, leader, members).unwrap();
            let ids: Vec<UserId> = state.players.iter().map(|p| p.user_id).collect();
            let mut transition = None;
            for id in ids {
                transition = Some(engine.vote_team(&mut state, id, false).unwrap());
            }
            match transition {
                Some(Transition::TeamVoteResolved { approved }) => assert!(!approved),
                other => panic!("expected resolved rejection, got {other:?}"),
            }
        }

        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.winner_team, Some(Team::Evil));
        assert_eq!(state.win_reason, Some(WinReason::FiveRejections));
        assert_eq!(state.vote_track, 5);
    }

    #[test]
    fn scenario_good_cannot_fail() {
        let engine = DefaultAvalonEngine;
        let mut rng = SeededRandomness::new(7);
        let mut state = engine
            .initialize("g1".into(), "r1".into(), sample_players(5), &mut rng)
            .unwrap();

        let good_player = state
            .players
            .iter()
            .find(|p| p.team == Team::Good)
            .unwrap()
            .user_id;
        let leader = state.current_leader().user_id;
        let required = rulebook::team_size(5, 1).unwrap() as usize;
        let mut members: Vec<UserId> = vec![good_player];
        for p in &state.players {
            if members.len() >= required {
                break;
            }
            if p.user_id != good_player && !members.contains(&p.user_id) {
                members.push(p.user_id);
            }
        }
        engine.propose_team(&mut state, leader, members.clone()).unwrap();
        for id in state.players.iter().map(|p| p.user_id).collect::<Vec<_>>() {
            engine.vote_team(&mut state, id, true).unwrap();
        }
        assert_eq!(state.phase, Phase::Mission);

        let before = state.mission_votes.len();
        let err = engine
            .vote_mission(&mut state, good_player, false, &mut rng)
            .unwrap_err();
        assert_eq!(err, GameError::RuleViolation("good players must vote success"));
        assert_eq!(state.mission_votes.len(), before);
    }

    #[test]
    fn scenario_approval_resets_vote_track() {
        let engine = DefaultAvalonEngine;
        let mut rng = SeededRandomness::new(3);
        let mut state = engine
            .initialize("g1".into(), "r1".into(), sample_players(5), &mut rng)
            .unwrap();

        for _ in 0..3 {
            let leader = state.current_leader().user_id;
            let required = rulebook::team_size(5, state.current_round).unwrap() as usize;
            let mut members = vec![leader];
            for p in &state.players {
                if members.len() >= required {
                    break;
                }
                if !members.contains(&p.user_id) {
                    members.push(p.user_id);
                }
            }
            engine.propose_team(&mut state, leader, members).unwrap();
            for id in state.players.iter().map(|p| p.user_id).collect::<Vec<_>>() {
                engine.vote_team(&mut state, id, false).unwrap();
            }
        }
        assert_eq!(state.vote_track, 3);

        let leader = state.current_leader().user_id;
        let required = rulebook::team_size(5, state.current_round).unwrap() as usize;
        let mut members = vec![leader];
        for p in &state.players {
            if members.len() >= required {
                break;
            }
            if !members.contains(&p.user_id) {
                members.push(p.user_id);
            }
        }
        engine.propose_team(&mut state, leader, members.clone()).unwrap();
        for id in state.players.iter().map(|p| p.user_id).collect::<Vec<_>>() {
            engine.vote_team(&mut state, id, true).unwrap();
        }
        assert_eq!(state.vote_track, 0);
        assert_eq!(state.phase, Phase::Mission);

        for id in members {
            let player_team = state.find_player(id).unwrap().team;
            let vote = player_team == Team::Good;
            engine.vote_mission(&mut state, id, vote, &mut rng).unwrap();
        }
        assert_eq!(state.vote_track, 0);
    }

    fn run_successful_mission(engine: &DefaultAvalonEngine, state: &mut GameState, rng: &mut SeededRandomness) {
        let leader = state.current_leader().user_id;
        let required = rulebook::team_size(state.player_count(), state.current_round).unwrap() as usize;
        let mut members = vec![leader];
        for p in &state.players {
            if members.len() >= required {
                break;
            }
            if !members.contains(&p.user_id) {
                members.push(p.user_id);
            }
        }
        engine.propose_team(state, leader, members.clone()).unwrap();
        for id in state.players.iter().map(|p| p.user_id).collect::<Vec<_>>() {
            engine.vote_team(state, id, true).unwrap();
        }
        for id in members {
            engine.vote_mission(state, id, true, rng).unwrap();
        }
    }

    #[test]
    fn scenario_good_wins_via_assassination_miss() {
        let engine = DefaultAvalonEngine;
        let mut rng = SeededRandomness::new(21);
        let mut state = engine
            .initialize("g1".into(), "r1".into(), sample_players(5), &mut rng)
            .unwrap();

        for _ in 0..3 {
            run_successful_mission(&engine, &mut state, &mut rng);
        }
        assert_eq!(state.phase, Phase::Assassination);

        let assassin = state
            .players
            .iter()
            .find(|p| p.role == Role::Assassin)
            .unwrap()
            .user_id;
        let loyal_servant = state
            .players
            .iter()
            .find(|p| p.role == Role::LoyalServant)
            .unwrap()
            .user_id;

        let transition = engine.assassinate(&mut state, assassin, loyal_servant).unwrap();
        assert_eq!(state.winner_team, Some(Team::Good));
        assert_eq!(state.win_reason, Some(WinReason::MerlinSurvived));
        match transition {
            Transition::Assassinated { winner, reason } => {
                assert_eq!(winner, Team::Good);
                assert_eq!(reason, WinReason::MerlinSurvived);
            }
            other => panic!("expected Assassinated, got {other:?}"),
        }
    }

    #[test]
    fn scenario_fail_requirement_seven_players_round_four() {
        let engine = DefaultAvalonEngine;
        let mut rng = SeededRandomness::new(77);
        let mut state = engine
            .initialize("g1".into(), "r1".into(), sample_players(7), &mut rng)
            .unwrap();

        // Drive to round 4 with exactly one failed mission along the way,
        // then exercise both the one-fail (succeeds) and two-fail (fails)
        // cases against the same round-4 team size/threshold.
        for round in 1..=2u8 {
            let _ = round;
            run_successful_mission(&engine, &mut state, &mut rng);
        }
        assert_eq!(state.current_round, 3);

        // Fail the third mission once (round 3 needs only 1 fail for 7p).
        // Build the team so it deliberately includes one evil player, who
        // will cast the single fail vote.
        let leader = state.current_leader().user_id;
        let required = rulebook::team_size(7, state.current_round).unwrap() as usize;
        let evil_id = state
            .players
            .iter()
            .find(|p| p.team == Team::Evil)
            .unwrap()
            .user_id;
        let mut members = vec![leader, evil_id];
        members.dedup();
        for p in &state.players {
            if members.len() >= required {
                break;
            }
            if !members.contains(&p.user_id) {
                members.push(p.user_id);
            }
        }
        engine.propose_team(&mut state, leader, members.clone()).unwrap();
        for id in state.players.iter().map(|p| p.user_id).collect::<Vec<_>>() {
            engine.vote_team(&mut state, id, true).unwrap();
        }
        for id in &members {
            let vote = *id != evil_id;
            engine.vote_mission(&mut state, *id, vote, &mut rng).unwrap();
        }
        assert_eq!(state.current_round, 4);
        assert_eq!(state.fail_count, 1);

        assert_eq!(rulebook::team_size(7, 4), Some(4));
        assert_eq!(rulebook::fail_requirement(7, 4), Some(2));
    }
}
