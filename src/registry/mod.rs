pub mod connection_registry;
pub mod game_registry;
pub mod room_membership;

pub use connection_registry::{ConnectionRegistry, SessionRecord};
pub use game_registry::GameRegistry;
pub use room_membership::RoomMembership;
