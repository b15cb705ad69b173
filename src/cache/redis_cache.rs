//! Redis-backed `GameCache`, pooled via `bb8`. Operation shape (hash for
//! room users, sorted set scored by join time for order, string+TTL for
//! sessions/room state/game snapshots) follows `original_source`'s
//! `RedisClient` one-to-one; see `db/redis.py` in the reference pack.

use async_trait::async_trait;
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;

use super::{keys, CacheError, GameCache, OrderedMember};

pub struct RedisCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(
        &self,
    ) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, CacheError> {
        self.pool.get().await.map_err(|e| CacheError::Backend(e.to_string()))
    }
}

#[async_trait]
impl GameCache for RedisCache {
    async fn set_session(&self, sid: &str, data: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(data).map_err(|e| CacheError::Backend(e.to_string()))?;
        conn.set_ex::<_, _, ()>(keys::session(sid), payload, ttl_secs)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn get_session(&self, sid: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(keys::session(sid))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Backend(e.to_string())))
            .transpose()
    }

    async fn delete_session(&self, sid: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys::session(sid))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn room_add_user(&self, room: &str, user_id: &str, session_id: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.hset::<_, _, _, ()>(keys::room_users(room), user_id, session_id)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn room_remove_user(&self, room: &str, user_id: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.hdel::<_, _, ()>(keys::room_users(room), user_id)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn room_users(&self, room: &str) -> Result<Vec<(String, String)>, CacheError> {
        let mut conn = self.conn().await?;
        let map: std::collections::HashMap<String, String> = conn
            .hgetall(keys::room_users(room))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(map.into_iter().collect())
    }

    async fn room_order_upsert(&self, room: &str, user_id: &str, score: f64) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.zadd::<_, _, _, ()>(keys::room_order(room), user_id, score)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn room_order_remove(&self, room: &str, user_id: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.zrem::<_, _, ()>(keys::room_order(room), user_id)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn room_order_members(&self, room: &str) -> Result<Vec<OrderedMember>, CacheError> {
        let mut conn = self.conn().await?;
        let raw: Vec<(String, f64)> = conn
            .zrange_withscores(keys::room_order(room), 0, -1)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(raw
            .into_iter()
            .map(|(user_id, score)| OrderedMember { user_id, score })
            .collect())
    }

    async fn set_room_state(&self, room: &str, state: &Value, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(state).map_err(|e| CacheError::Backend(e.to_string()))?;
        conn.set_ex::<_, _, ()>(keys::room_state(room), payload, ttl_secs)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn get_room_state(&self, room: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(keys::room_state(room))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Backend(e.to_string())))
            .transpose()
    }

    async fn bind_room_game(&self, room: &str, game_id: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(keys::room_game(room), game_id)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn get_room_game(&self, room: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        conn.get(keys::room_game(room)).await.map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn unbind_room_game(&self, room: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys::room_game(room))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn set_game_state(&self, game_id: &str, state: &Value) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(state).map_err(|e| CacheError::Backend(e.to_string()))?;
        conn.set::<_, _, ()>(keys::game_state(game_id), payload)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn get_game_state(&self, game_id: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn
            .get(keys::game_state(game_id))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        raw.map(|s| serde_json::from_str(&s).map_err(|e| CacheError::Backend(e.to_string())))
            .transpose()
    }

    async fn delete_game_state(&self, game_id: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys::game_state(game_id))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn delete_room(&self, room: &str) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        for key in keys::all_room_keys(room) {
            conn.del::<_, ()>(key).await.map_err(|e| CacheError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}
