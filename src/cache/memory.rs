//! An in-process stand-in for the cache, used by tests and by the in-memory
//! demo wiring. Shape mirrors the teacher's `DemoSessionStore`
//! (`server/demo/session_store.rs`): a `parking_lot::RwLock`-guarded
//! `HashMap`, no background eviction here since TTL expiry is exercised at
//! the registry layer instead.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use super::{CacheError, GameCache, OrderedMember};

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, Value>,
    room_users: HashMap<String, HashMap<String, String>>,
    room_order: HashMap<String, HashMap<String, f64>>,
    room_state: HashMap<String, Value>,
    room_game: HashMap<String, String>,
    game_state: HashMap<String, Value>,
}

#[derive(Default)]
pub struct InMemoryCache {
    inner: RwLock<Inner>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameCache for InMemoryCache {
    async fn set_session(&self, sid: &str, data: &Value, _ttl_secs: u64) -> Result<(), CacheError> {
        self.inner.write().sessions.insert(sid.to_string(), data.clone());
        Ok(())
    }

    async fn get_session(&self, sid: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.inner.read().sessions.get(sid).cloned())
    }

    async fn delete_session(&self, sid: &str) -> Result<(), CacheError> {
        self.inner.write().sessions.remove(sid);
        Ok(())
    }

    async fn room_add_user(&self, room: &str, user_id: &str, session_id: &str) -> Result<(), CacheError> {
        self.inner
            .write()
            .room_users
            .entry(room.to_string())
            .or_default()
            .insert(user_id.to_string(), session_id.to_string());
        Ok(())
    }

    async fn room_remove_user(&self, room: &str, user_id: &str) -> Result<(), CacheError> {
        if let Some(users) = self.inner.write().room_users.get_mut(room) {
            users.remove(user_id);
        }
        Ok(())
    }

    async fn room_users(&self, room: &str) -> Result<Vec<(String, String)>, CacheError> {
        Ok(self
            .inner
            .read()
            .room_users
            .get(room)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn room_order_upsert(&self, room: &str, user_id: &str, score: f64) -> Result<(), CacheError> {
        self.inner
            .write()
            .room_order
            .entry(room.to_string())
            .or_default()
            .insert(user_id.to_string(), score);
        Ok(())
    }

    async fn room_order_remove(&self, room: &str, user_id: &str) -> Result<(), CacheError> {
        if let Some(order) = self.inner.write().room_order.get_mut(room) {
            order.remove(user_id);
        }
        Ok(())
    }

    async fn room_order_members(&self, room: &str) -> Result<Vec<OrderedMember>, CacheError> {
        let mut members: Vec<OrderedMember> = self
            .inner
            .read()
            .room_order
            .get(room)
            .map(|m| {
                m.iter()
                    .map(|(user_id, score)| OrderedMember {
                        user_id: user_id.clone(),
                        score: *score,
                    })
                    .collect()
            })
            .unwrap_or_default();
        members.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap());
        Ok(members)
    }

    async fn set_room_state(&self, room: &str, state: &Value, _ttl_secs: u64) -> Result<(), CacheError> {
        self.inner.write().room_state.insert(room.to_string(), state.clone());
        Ok(())
    }

    async fn get_room_state(&self, room: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.inner.read().room_state.get(room).cloned())
    }

    async fn bind_room_game(&self, room: &str, game_id: &str) -> Result<(), CacheError> {
        self.inner.write().room_game.insert(room.to_string(), game_id.to_string());
        Ok(())
    }

    async fn get_room_game(&self, room: &str) -> Result<Option<String>, CacheError> {
        Ok(self.inner.read().room_game.get(room).cloned())
    }

    async fn unbind_room_game(&self, room: &str) -> Result<(), CacheError> {
        self.inner.write().room_game.remove(room);
        Ok(())
    }

    async fn set_game_state(&self, game_id: &str, state: &Value) -> Result<(), CacheError> {
        self.inner.write().game_state.insert(game_id.to_string(), state.clone());
        Ok(())
    }

    async fn get_game_state(&self, game_id: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.inner.read().game_state.get(game_id).cloned())
    }

    async fn delete_game_state(&self, game_id: &str) -> Result<(), CacheError> {
        self.inner.write().game_state.remove(game_id);
        Ok(())
    }

    async fn delete_room(&self, room: &str) -> Result<(), CacheError> {
        let mut inner = self.inner.write();
        inner.room_users.remove(room);
        inner.room_order.remove(room);
        inner.room_state.remove(room);
        inner.room_game.remove(room);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn room_order_members_sorted_ascending() {
        let cache = InMemoryCache::new();
        cache.room_order_upsert("r1", "b", 2.0).await.unwrap();
        cache.room_order_upsert("r1", "a", 1.0).await.unwrap();
        cache.room_order_upsert("r1", "c", 3.0).await.unwrap();
        let members = cache.room_order_members("r1").await.unwrap();
        let ids: Vec<&str> = members.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
