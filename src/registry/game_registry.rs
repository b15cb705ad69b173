//! §4.C Game Registry: process-wide map from game id to live state,
//! write-through to the cache, restoration on miss. The in-memory map is a
//! `DashMap` (teacher's `game/coordinator/manager.rs` keeps its
//! `active_hands` index the same way) so lookups never block on another
//! game's mutation; each entry's value is an `Arc<Mutex<GameState>>` so a
//! handler can hold the lock across the whole mutation step, satisfying the
//! per-game serial execution requirement of §5.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::GameCache;
use crate::domain::GameState;
use crate::engine::avalon::{restore, snapshot, GameError};

const LOG_TARGET: &str = "registry::game";

pub struct GameRegistry {
    live: DashMap<String, Arc<Mutex<GameState>>>,
    cache: Arc<dyn GameCache>,
}

impl GameRegistry {
    pub fn new(cache: Arc<dyn GameCache>) -> Self {
        Self {
            live: DashMap::new(),
            cache,
        }
    }

    /// Inserts a freshly-initialized game and writes its first snapshot.
    pub async fn insert(&self, state: GameState) -> Result<Arc<Mutex<GameState>>, GameError> {
        let game_id = state.game_id.clone();
        self.persist(&state).await;
        let handle = Arc::new(Mutex::new(state));
        self.live.insert(game_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// In-memory first; on miss, rehydrate from the cache. Per §9, a
    /// restored snapshot that fails invariants is discarded rather than
    /// trusted (`restore` already enforces this).
    pub async fn get(&self, game_id: &str) -> Result<Option<Arc<Mutex<GameState>>>, GameError> {
        if let Some(handle) = self.live.get(game_id) {
            return Ok(Some(Arc::clone(&handle)));
        }

        let Some(raw) = self
            .cache
            .get_game_state(game_id)
            .await
            .map_err(|e| GameError::validation(format!("cache read failed: {e}")))?
        else {
            return Ok(None);
        };

        match restore(raw) {
            Ok(state) => {
                info!(target: LOG_TARGET, game_id, "restored game from cache mirror");
                let handle = Arc::new(Mutex::new(state));
                self.live.insert(game_id.to_string(), Arc::clone(&handle));
                Ok(Some(handle))
            }
            Err(err) => {
                warn!(target: LOG_TARGET, game_id, ?err, "discarding inconsistent snapshot");
                Ok(None)
            }
        }
    }

    /// Must be called after every resolved phase transition (§4.C). Cache
    /// I/O failures are logged and do not affect in-memory authority (§7).
    pub async fn persist(&self, state: &GameState) {
        match snapshot(state) {
            Ok(value) => {
                if let Err(err) = self.cache.set_game_state(&state.game_id, &value).await {
                    warn!(target: LOG_TARGET, game_id = %state.game_id, %err, "snapshot write failed");
                }
            }
            Err(err) => {
                warn!(target: LOG_TARGET, game_id = %state.game_id, ?err, "snapshot serialisation failed");
            }
        }
    }

    pub async fn remove(&self, game_id: &str) {
        self.live.remove(game_id);
        if let Err(err) = self.cache.delete_game_state(game_id).await {
            warn!(target: LOG_TARGET, game_id, %err, "failed to delete cached snapshot");
        }
    }

    pub async fn game_id_for_room(&self, room_id: &str) -> Result<Option<String>, GameError> {
        self.cache
            .get_room_game(room_id)
            .await
            .map_err(|e| GameError::validation(format!("cache read failed: {e}")))
    }

    pub async fn bind_room(&self, room_id: &str, game_id: &str) -> Result<(), GameError> {
        self.cache
            .bind_room_game(room_id, game_id)
            .await
            .map_err(|e| GameError::validation(format!("cache write failed: {e}")))
    }

    pub async fn unbind_room(&self, room_id: &str) -> Result<(), GameError> {
        self.cache
            .unbind_room_game(room_id)
            .await
            .map_err(|e| GameError::validation(format!("cache write failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::domain::{Phase, RawPlayer};
    use crate::engine::avalon::{AvalonEngine, DefaultAvalonEngine, SeededRandomness};

    #[tokio::test]
    async fn insert_then_get_round_trips_through_cache_on_miss() {
        let cache = Arc::new(InMemoryCache::new());
        let registry = GameRegistry::new(cache);

        let players: Vec<RawPlayer> = (0..5)
            .map(|i| RawPlayer {
                user_id: i,
                username: format!("u{i}"),
                display_name: format!("U{i}"),
            })
            .collect();
        let mut rng = SeededRandomness::new(5);
        let state = DefaultAvalonEngine
            .initialize("g1".into(), "r1".into(), players, &mut rng)
            .unwrap();
        registry.insert(state).await.unwrap();

        // Simulate process restart: drop the in-memory entry, keep the cache.
        registry.live.remove("g1");
        let restored = registry.get("g1").await.unwrap().unwrap();
        let locked = restored.lock().await;
        assert_eq!(locked.phase, Phase::TeamSelection);
    }
}
