//! Response bodies for the plain HTTP surface (health check, room bootstrap
//! lookup). Mirrors the teacher's `dto.rs`'s role: small `Serialize` structs
//! kept separate from the domain types they're built from.

use serde::Serialize;

use crate::domain::{GameId, RoomId};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RoomGameResponse {
    pub room_id: RoomId,
    pub game_id: Option<GameId>,
}
