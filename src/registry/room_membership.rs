//! §4.E Room Membership / Host Succession, backed by the cache's hash +
//! sorted-set pair (§6.3), with host-succession policy grounded on
//! `manager.py::_handle_host_transfer` and `redis.py::get_next_host`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::cache::GameCache;
use crate::directory::RoomDirectory;
use crate::domain::UserId;

const LOG_TARGET: &str = "registry::room_membership";

pub struct RoomMembership {
    cache: Arc<dyn GameCache>,
    directory: Arc<dyn RoomDirectory>,
}

fn now_score() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs_f64()
}

impl RoomMembership {
    pub fn new(cache: Arc<dyn GameCache>, directory: Arc<dyn RoomDirectory>) -> Self {
        Self { cache, directory }
    }

    pub async fn join(&self, room: &str, user_id: UserId, session_id: &str) -> Result<(), crate::cache::CacheError> {
        let user = user_id.to_string();
        self.cache.room_add_user(room, &user, session_id).await?;
        self.cache.room_order_upsert(room, &user, now_score()).await?;
        Ok(())
    }

    pub async fn leave(&self, room: &str, user_id: UserId) -> Result<(), crate::cache::CacheError> {
        let user = user_id.to_string();
        self.cache.room_remove_user(room, &user).await?;
        self.cache.room_order_remove(room, &user).await?;
        Ok(())
    }

    /// Member with the smallest join score, excluding `excluding`.
    pub async fn next_host(&self, room: &str, excluding: UserId) -> Result<Option<UserId>, crate::cache::CacheError> {
        let members = self.cache.room_order_members(room).await?;
        let excluded = excluding.to_string();
        Ok(members
            .into_iter()
            .find(|m| m.user_id != excluded)
            .and_then(|m| m.user_id.parse().ok()))
    }

    pub async fn clear(&self, room: &str) -> Result<(), crate::cache::CacheError> {
        self.cache.delete_room(room).await
    }

    /// Host-succession policy (§4.E): call BEFORE removing the leaver from
    /// membership. Returns the elected successor if a host change occurred.
    /// A failure to update the authoritative room record is logged and does
    /// not block the in-memory/cache membership update or the broadcast
    /// (§11's non-fatal host-record-write note).
    pub async fn handle_departure(
        &self,
        room: &str,
        leaving_user_id: UserId,
    ) -> Result<Option<UserId>, crate::cache::CacheError> {
        let current_host = self
            .directory
            .host_of(room)
            .await
            .map_err(|e| crate::cache::CacheError::Backend(e.to_string()))?;

        if current_host != Some(leaving_user_id) {
            return Ok(None);
        }

        let Some(successor) = self.next_host(room, leaving_user_id).await? else {
            info!(target: LOG_TARGET, room, "no eligible successor, room effectively empty");
            return Ok(None);
        };

        if let Err(err) = self.directory.set_host(room, successor).await {
            warn!(target: LOG_TARGET, room, successor, %err, "failed to persist new host, broadcasting anyway");
        } else {
            info!(target: LOG_TARGET, room, successor, "host transferred");
        }

        Ok(Some(successor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::directory::InMemoryRoomDirectory;

    #[tokio::test]
    async fn host_succession_picks_earliest_remaining_joiner() {
        let cache = Arc::new(InMemoryCache::new());
        let directory = Arc::new(InMemoryRoomDirectory::new());
        directory.set_host("room1", 1).await.unwrap();
        let membership = RoomMembership::new(cache.clone(), directory.clone());

        membership.join("room1", 1, "sid1").await.unwrap();
        cache.room_order_upsert("room1", "2", 1.0).await.unwrap();
        cache.room_order_upsert("room1", "3", 2.0).await.unwrap();

        let successor = membership.handle_departure("room1", 1).await.unwrap();
        assert_eq!(successor, Some(2));
        assert_eq!(directory.host_of("room1").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn non_host_departure_does_not_transfer() {
        let cache = Arc::new(InMemoryCache::new());
        let directory = Arc::new(InMemoryRoomDirectory::new());
        directory.set_host("room1", 1).await.unwrap();
        let membership = RoomMembership::new(cache, directory.clone());

        let result = membership.handle_departure("room1", 2).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(directory.host_of("room1").await.unwrap(), Some(1));
    }
}
