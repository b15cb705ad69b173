//! §4.D Connection Registry. Shape mirrors the teacher's
//! `DemoSessionStore` (`server/demo/session_store.rs`): an
//! `Arc<RwLock<HashMap<..>>>` guarding session records, a background
//! `tokio::spawn` task evicting TTL-expired mirrors, and a `Drop` impl that
//! aborts that task so a dropped registry doesn't leak it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::UserId;

const LOG_TARGET: &str = "registry::connection";
pub const SESSION_TTL: Duration = Duration::from_secs(86_400);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub room_id: Option<String>,
    /// Monotonic connection order, used to break ties deterministically
    /// when dedup'ing a room roster by user id (`HashMap` iteration order
    /// carries no ordering guarantee of its own).
    connect_seq: u64,
    last_touched: Instant,
}

impl SessionRecord {
    fn guest(connect_seq: u64) -> Self {
        Self {
            user_id: None,
            username: None,
            display_name: None,
            room_id: None,
            connect_seq,
            last_touched: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.last_touched.elapsed() > ttl
    }
}

pub struct ConnectionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    ttl: Duration,
    cleanup_handle: Option<JoinHandle<()>>,
    next_connect_seq: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let sessions = Arc::new(RwLock::new(HashMap::new()));
        let cleanup_handle = Some(Self::start_cleanup_task(Arc::clone(&sessions), ttl));
        Self {
            sessions,
            ttl,
            cleanup_handle,
            next_connect_seq: AtomicU64::new(0),
        }
    }

    fn start_cleanup_task(
        sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
        ttl: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let mut guard = sessions.write().await;
                let before = guard.len();
                guard.retain(|_, record| !record.is_expired(ttl));
                let after = guard.len();
                if before != after {
                    info!(
                        target: LOG_TARGET,
                        evicted = before - after,
                        remaining = after,
                        "evicted expired connection sessions"
                    );
                }
            }
        })
    }

    /// §11: an absent/empty auth payload creates a guest session.
    pub async fn connect(&self, session_id: &str) {
        let seq = self.next_connect_seq.fetch_add(1, Ordering::Relaxed);
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), SessionRecord::guest(seq));
        debug!(target: LOG_TARGET, session_id, "connection registered");
    }

    pub async fn disconnect(&self, session_id: &str) -> Option<SessionRecord> {
        let removed = self.sessions.write().await.remove(session_id);
        debug!(target: LOG_TARGET, session_id, "connection deregistered");
        removed
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn bind_identity(
        &self,
        session_id: &str,
        user_id: UserId,
        username: String,
        display_name: String,
        room_id: String,
    ) {
        let mut guard = self.sessions.write().await;
        if let Some(record) = guard.get_mut(session_id) {
            record.user_id = Some(user_id);
            record.username = Some(username);
            record.display_name = Some(display_name);
            record.room_id = Some(room_id);
            record.last_touched = Instant::now();
        }
    }

    pub async fn unbind_room(&self, session_id: &str) {
        let mut guard = self.sessions.write().await;
        if let Some(record) = guard.get_mut(session_id) {
            record.room_id = None;
        }
    }

    /// Enumerate sessions in `room`, deduplicated by user id (first seen
    /// wins), matching `manager.py::get_room_players`.
    pub async fn room_roster(&self, room_id: &str) -> Vec<SessionRecord> {
        self.room_roster_with_sessions(room_id)
            .await
            .into_iter()
            .map(|(_, record)| record)
            .collect()
    }

    /// Same as `room_roster` but keeps each session id alongside its record,
    /// which the dispatcher needs to address the fan-out transport.
    pub async fn room_roster_with_sessions(&self, room_id: &str) -> Vec<(String, SessionRecord)> {
        let guard = self.sessions.read().await;
        let mut matching: Vec<(String, SessionRecord)> = guard
            .iter()
            .filter(|(_, record)| record.room_id.as_deref() == Some(room_id))
            .map(|(session_id, record)| (session_id.clone(), record.clone()))
            .collect();
        // `HashMap` iteration order carries no relation to connection order,
        // so sort by `connect_seq` first to make "first seen wins" below
        // deterministically mean "first connected", matching the ordered
        // dict iteration `manager.py::get_room_players` relies on.
        matching.sort_by_key(|(_, record)| record.connect_seq);

        let mut seen = std::collections::HashSet::new();
        let mut roster = Vec::new();
        for (session_id, record) in matching {
            if let Some(uid) = record.user_id {
                if seen.insert(uid) {
                    roster.push((session_id, record));
                }
            }
        }
        roster
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn room_roster_deduplicates_by_user_id() {
        let registry = ConnectionRegistry::new();
        registry.connect("sid-a").await;
        registry.connect("sid-b").await;
        registry
            .bind_identity("sid-a", 7, "alice".into(), "Alice".into(), "room1".into())
            .await;
        registry
            .bind_identity("sid-b", 7, "alice".into(), "Alice".into(), "room1".into())
            .await;

        let roster = registry.room_roster("room1").await;
        assert_eq!(roster.len(), 1);
    }
}
