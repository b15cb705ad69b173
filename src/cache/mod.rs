//! The durable key-value cache (§6.3): session mirror, room membership,
//! room state, and game snapshots. Modelled as a trait so the registries
//! above it never depend on a concrete client, the same way the teacher
//! keeps `EventStore`/`SnapshotStore` as traits in `ledger/store.rs` with a
//! SeaORM-backed implementation underneath.

pub mod keys;
pub mod memory;
pub mod redis_cache;

pub use memory::InMemoryCache;
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// A member of a room's join-order sorted set together with its score
/// (wall-clock join time in fractional seconds, per §3).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMember {
    pub user_id: String,
    pub score: f64,
}

#[async_trait]
pub trait GameCache: Send + Sync {
    async fn set_session(&self, sid: &str, data: &Value, ttl_secs: u64) -> Result<(), CacheError>;
    async fn get_session(&self, sid: &str) -> Result<Option<Value>, CacheError>;
    async fn delete_session(&self, sid: &str) -> Result<(), CacheError>;

    async fn room_add_user(&self, room: &str, user_id: &str, session_id: &str) -> Result<(), CacheError>;
    async fn room_remove_user(&self, room: &str, user_id: &str) -> Result<(), CacheError>;
    async fn room_users(&self, room: &str) -> Result<Vec<(String, String)>, CacheError>;

    async fn room_order_upsert(&self, room: &str, user_id: &str, score: f64) -> Result<(), CacheError>;
    async fn room_order_remove(&self, room: &str, user_id: &str) -> Result<(), CacheError>;
    /// Ascending by score (earliest join first) — defines host-succession order.
    async fn room_order_members(&self, room: &str) -> Result<Vec<OrderedMember>, CacheError>;

    async fn set_room_state(&self, room: &str, state: &Value, ttl_secs: u64) -> Result<(), CacheError>;
    async fn get_room_state(&self, room: &str) -> Result<Option<Value>, CacheError>;

    async fn bind_room_game(&self, room: &str, game_id: &str) -> Result<(), CacheError>;
    async fn get_room_game(&self, room: &str) -> Result<Option<String>, CacheError>;
    async fn unbind_room_game(&self, room: &str) -> Result<(), CacheError>;

    async fn set_game_state(&self, game_id: &str, state: &Value) -> Result<(), CacheError>;
    async fn get_game_state(&self, game_id: &str) -> Result<Option<Value>, CacheError>;
    async fn delete_game_state(&self, game_id: &str) -> Result<(), CacheError>;

    /// Removes every key this crate ever writes for `room`. Unlike the
    /// original's `KEYS room:<code>:*` scan (an anti-pattern on a shared
    /// Redis instance), this deletes each known key explicitly.
    async fn delete_room(&self, room: &str) -> Result<(), CacheError>;
}
