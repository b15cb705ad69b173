//! Inbound/outbound event payload shapes (§6.1, §6.2). Inbound events arrive
//! as loosely-typed client payloads; per §9's "dynamic payload shapes" note,
//! they are normalised here into tagged variants at the dispatcher boundary
//! rather than passed through as raw JSON into the engine.

use serde::Deserialize;

use crate::domain::UserId;

/// An absent/empty `auth` payload at `connect` creates a guest session
/// (§11), so every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConnectAuth {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinRoomPayload {
    pub room_id: String,
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaveRoomPayload {
    pub room_id: String,
    pub user_id: UserId,
    #[allow(dead_code)]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartGamePayload {
    pub room_id: String,
    pub game_type: String,
    pub game_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProposeTeamPayload {
    pub game_id: String,
    pub team_members: Vec<UserId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteTeamPayload {
    pub game_id: String,
    pub approve: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteMissionPayload {
    pub game_id: String,
    pub success: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssassinatePayload {
    pub game_id: String,
    pub target_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetGameStatePayload {
    pub game_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadyTogglePayload {
    pub room_id: String,
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessagePayload {
    pub room_id: String,
    pub message: String,
}

/// Outbound event name constants (§6.2), kept as `&'static str` the way
/// `Transition` discriminants are turned into broadcast tags elsewhere, so a
/// typo in an event name is a compile error at the call site, not a typo
/// silently shipped over the wire.
pub const EV_CONNECTED: &str = "connected";
pub const EV_USER_JOINED: &str = "user_joined";
pub const EV_USER_LEFT: &str = "user_left";
pub const EV_ROOM_USERS: &str = "room_users";
pub const EV_HOST_CHANGED: &str = "host_changed";
pub const EV_GAME_STARTED: &str = "game_started";
pub const EV_ROLE_ASSIGNED: &str = "role_assigned";
pub const EV_GAME_STATE_UPDATE: &str = "game_state_update";
pub const EV_TEAM_PROPOSED: &str = "team_proposed";
pub const EV_TEAM_VOTE_UPDATE: &str = "team_vote_update";
pub const EV_TEAM_VOTE_RESULT: &str = "team_vote_result";
pub const EV_MISSION_VOTE_UPDATE: &str = "mission_vote_update";
pub const EV_MISSION_RESULT: &str = "mission_result";
pub const EV_ASSASSINATION_RESULT: &str = "assassination_result";
pub const EV_GAME_ENDED: &str = "game_ended";
pub const EV_ERROR: &str = "error";
pub const EV_READY_TOGGLED: &str = "ready_toggled";
pub const EV_CHAT_MESSAGE: &str = "chat_message";

/// §6.1's capacity error strings are part of the external contract for
/// client UI compatibility; kept verbatim rather than routed through a
/// generic `Capacity` rendering.
pub const ERR_TOO_FEW_PLAYERS: &str = "아발론은 최소 5명이 필요합니다";
pub const ERR_TOO_MANY_PLAYERS: &str = "아발론은 최대 10명까지 가능합니다";
