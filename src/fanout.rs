//! §4.G Fan-out primitives. Each connected transport registers an
//! `mpsc::UnboundedSender` here at connect time; the actual websocket task
//! (in `server::ws`) owns the receiving half and writes frames to the
//! socket. This indirection mirrors the teacher's `broadcast::Sender`/
//! `Receiver` pair in `game/coordinator/realtime.rs`, swapped for a
//! per-socket `mpsc` channel since fan-out here is per-recipient-projected
//! rather than identical-to-all.
//!
//! `emit_room`/`emit_projected` take the already-resolved list of session
//! ids for a room (the dispatcher resolves this via the connection
//! registry's room roster) rather than reaching into it themselves, so this
//! module stays a pure "who do I have a channel for" primitive.

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const LOG_TARGET: &str = "fanout";

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub event: &'static str,
    pub payload: Value,
}

pub struct Fanout {
    transports: DashMap<String, mpsc::UnboundedSender<OutboundMessage>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self {
            transports: DashMap::new(),
        }
    }

    pub fn register(&self, session_id: String) -> mpsc::UnboundedReceiver<OutboundMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.transports.insert(session_id, tx);
        rx
    }

    pub fn unregister(&self, session_id: &str) {
        self.transports.remove(session_id);
    }

    /// `emit(session_id, event, payload)` — unicast to one transport.
    pub fn emit(&self, session_id: &str, event: &'static str, payload: Value) {
        if let Some(tx) = self.transports.get(session_id) {
            if tx.send(OutboundMessage { event, payload }).is_err() {
                warn!(target: LOG_TARGET, session_id, "transport receiver dropped");
            }
        } else {
            debug!(target: LOG_TARGET, session_id, "emit to unknown transport ignored");
        }
    }

    /// `emit_room(room, event, payload)` — identical payload to every
    /// transport in `session_ids`.
    pub fn emit_room(&self, session_ids: &[String], event: &'static str, payload: Value) {
        for session_id in session_ids {
            self.emit(session_id, event, payload.clone());
        }
    }

    /// `emit_projected(room, event, per_user_payload)` — call `project` once
    /// per `(session_id, user_id)` pair and send each its own result.
    pub fn emit_projected<F>(
        &self,
        recipients: &[(String, crate::domain::UserId)],
        event: &'static str,
        mut project: F,
    ) where
        F: FnMut(crate::domain::UserId) -> Option<Value>,
    {
        for (session_id, user_id) in recipients {
            if let Some(payload) = project(*user_id) {
                self.emit(session_id, event, payload);
            }
        }
    }
}

impl Default for Fanout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_delivers_to_registered_transport() {
        let fanout = Fanout::new();
        let mut rx = fanout.register("sid1".into());
        fanout.emit("sid1", "connected", serde_json::json!({"ok": true}));
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event, "connected");
    }
}
