//! The one external-collaborator seam this crate defines (§1, §12): the
//! authoritative room record lives in a relational store out of scope here.
//! `RoomDirectory` is the trait a real deployment implements against its
//! own database; this crate ships only the trait and an in-memory test
//! double, grounded on `ledger/lobby/storage/in_memory.rs`'s shape.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::domain::UserId;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("room directory error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn host_of(&self, room_id: &str) -> Result<Option<UserId>, DirectoryError>;
    async fn set_host(&self, room_id: &str, user_id: UserId) -> Result<(), DirectoryError>;
}

#[derive(Default)]
pub struct InMemoryRoomDirectory {
    hosts: RwLock<HashMap<String, UserId>>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    async fn host_of(&self, room_id: &str) -> Result<Option<UserId>, DirectoryError> {
        Ok(self.hosts.read().get(room_id).copied())
    }

    async fn set_host(&self, room_id: &str, user_id: UserId) -> Result<(), DirectoryError> {
        self.hosts.write().insert(room_id.to_string(), user_id);
        Ok(())
    }
}
