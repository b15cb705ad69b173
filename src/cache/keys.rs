//! Key layout, exactly per §6.3.

pub fn session(sid: &str) -> String {
    format!("session:{sid}")
}

pub fn room_users(room: &str) -> String {
    format!("room:{room}:users")
}

pub fn room_order(room: &str) -> String {
    format!("room:{room}:order")
}

pub fn room_state(room: &str) -> String {
    format!("room:{room}:state")
}

pub fn room_game(room: &str) -> String {
    format!("room:{room}:game")
}

pub fn game_state(game_id: &str) -> String {
    format!("game:{game_id}:state")
}

/// Every key this crate ever writes for a room, for `delete_room`.
pub fn all_room_keys(room: &str) -> [String; 4] {
    [room_users(room), room_order(room), room_state(room), room_game(room)]
}
