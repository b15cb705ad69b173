//! Core domain types shared by the engine, registries, and dispatcher.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod game_state;

pub use game_state::*;

pub type GameId = String;
pub type RoomId = String;
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Merlin,
    Percival,
    LoyalServant,
    Mordred,
    Morgana,
    Assassin,
    Oberon,
    Minion,
}

impl Role {
    pub fn team(self) -> Team {
        match self {
            Role::Merlin | Role::Percival | Role::LoyalServant => Team::Good,
            Role::Mordred | Role::Morgana | Role::Assassin | Role::Oberon | Role::Minion => {
                Team::Evil
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Good,
    Evil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Night,
    TeamSelection,
    TeamVote,
    Mission,
    Assassination,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    FiveRejections,
    ThreeFailedMissions,
    MerlinAssassinated,
    MerlinSurvived,
}

/// A room participant before role/team assignment, as supplied by the
/// dispatcher from the connection registry's room roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlayer {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub team: Team,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionRecord {
    pub round: u8,
    pub team_size: u8,
    pub leader_id: UserId,
    /// Ordered roster of the players sent on this mission.
    pub team: Vec<UserId>,
    pub team_votes: BTreeMap<UserId, bool>,
    /// Success/fail votes cast on the mission, shuffled so the order
    /// carries no information about which player cast which vote.
    pub mission_votes: Vec<bool>,
    pub outcome: MissionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionOutcome {
    Success,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownInfoEntry {
    pub user_id: UserId,
    pub info_tag: InfoTag,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoTag {
    Evil,
    MerlinOrMorgana,
    EvilTeammate,
}
