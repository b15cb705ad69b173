//! Broadcast-safe public state and per-player projections (§4.B).

use serde::{Deserialize, Serialize};

use crate::domain::{
    GameState, InfoTag, KnownInfoEntry, MissionOutcome, MissionRecord, Phase, Role, Team, UserId,
    WinReason,
};
use crate::rulebook;

/// The shared state every connected client may see: never exposes who voted
/// which way before a vote resolves, nor anyone's role before game end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicState {
    pub game_id: String,
    pub phase: Phase,
    pub round: u8,
    pub current_leader_id: UserId,
    pub vote_track: u8,
    pub mission_results: [Option<MissionOutcome>; 5],
    pub success_count: u8,
    pub fail_count: u8,
    pub proposed_team: Vec<UserId>,
    pub team_votes_cast: usize,
    pub team_votes_needed: usize,
    pub mission_votes_cast: usize,
    pub mission_votes_needed: usize,
    pub mission_history: Vec<MissionRecord>,
    pub winner_team: Option<Team>,
    pub win_reason: Option<WinReason>,
    pub required_team_size: u8,
}

impl PublicState {
    pub fn project(state: &GameState) -> Self {
        let n = state.player_count();
        let required_team_size = rulebook::team_size(n, state.current_round).unwrap_or(0);
        PublicState {
            game_id: state.game_id.clone(),
            phase: state.phase,
            round: state.current_round,
            current_leader_id: state.current_leader().user_id,
            vote_track: state.vote_track,
            mission_results: state.mission_results,
            success_count: state.success_count,
            fail_count: state.fail_count,
            proposed_team: state.proposed_team.clone(),
            team_votes_cast: state.team_votes.len(),
            team_votes_needed: n,
            mission_votes_cast: state.mission_votes.len(),
            mission_votes_needed: state.proposed_team.len(),
            mission_history: state.mission_history.clone(),
            winner_team: state.winner_team,
            win_reason: state.win_reason,
            required_team_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    #[serde(flatten)]
    pub public: PublicState,
    pub my_role: Role,
    pub my_team: Team,
    pub known_info: Vec<KnownInfoEntry>,
    pub can_act: bool,
    pub available_actions: Vec<&'static str>,
    pub my_team_vote: Option<bool>,
    pub my_mission_vote: Option<bool>,
}

/// Hidden-information visibility rules (§4.B).
pub fn known_info_for(state: &GameState, viewer_id: UserId) -> Vec<KnownInfoEntry> {
    let viewer = match state.find_player(viewer_id) {
        Some(p) => p,
        None => return Vec::new(),
    };

    let entry = |p: &crate::domain::Player, tag: InfoTag| KnownInfoEntry {
        user_id: p.user_id,
        info_tag: tag,
        display_name: p.display_name.clone(),
    };

    match viewer.role {
        Role::Merlin => state
            .players
            .iter()
            .filter(|p| p.team == Team::Evil && p.role != Role::Mordred)
            .map(|p| entry(p, InfoTag::Evil))
            .collect(),
        Role::Percival => state
            .players
            .iter()
            .filter(|p| p.role == Role::Merlin || p.role == Role::Morgana)
            .map(|p| entry(p, InfoTag::MerlinOrMorgana))
            .collect(),
        Role::Oberon => Vec::new(),
        _ if viewer.team == Team::Evil => state
            .players
            .iter()
            .filter(|p| {
                p.user_id != viewer_id && p.team == Team::Evil && p.role != Role::Oberon
            })
            .map(|p| entry(p, InfoTag::EvilTeammate))
            .collect(),
        _ => Vec::new(),
    }
}

fn can_act_for(state: &GameState, user_id: UserId) -> bool {
    match state.phase {
        Phase::TeamSelection => state.current_leader().user_id == user_id,
        Phase::TeamVote => {
            state.is_current_player(user_id) && !state.team_votes.contains_key(&user_id)
        }
        Phase::Mission => {
            state.proposed_team.contains(&user_id) && !state.mission_votes.contains_key(&user_id)
        }
        Phase::Assassination => state
            .find_player(user_id)
            .map(|p| p.role == Role::Assassin)
            .unwrap_or(false),
        Phase::Night | Phase::GameOver => false,
    }
}

fn available_actions_for(state: &GameState, user_id: UserId) -> Vec<&'static str> {
    let mut actions = Vec::new();
    if !can_act_for(state, user_id) {
        return actions;
    }
    match state.phase {
        Phase::TeamSelection => actions.push("propose_team"),
        Phase::TeamVote => actions.push("vote_team"),
        Phase::Mission => {
            actions.push("vote_mission");
            if let Some(p) = state.find_player(user_id) {
                if p.team == Team::Evil {
                    actions.push("can_fail");
                }
            }
        }
        Phase::Assassination => actions.push("assassinate"),
        Phase::Night | Phase::GameOver => {}
    }
    actions
}

pub fn player_view(state: &GameState, user_id: UserId) -> Option<PlayerView> {
    let player = state.find_player(user_id)?;
    Some(PlayerView {
        public: PublicState::project(state),
        my_role: player.role,
        my_team: player.team,
        known_info: known_info_for(state, user_id),
        can_act: can_act_for(state, user_id),
        available_actions: available_actions_for(state, user_id),
        my_team_vote: state.team_votes.get(&user_id).copied(),
        my_mission_vote: state.mission_votes.get(&user_id).copied(),
    })
}
