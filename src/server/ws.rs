//! The websocket transport. Grounded on the general axum
//! `WebSocketUpgrade`/`socket.split()`/paired-tasks shape used by
//! `websocket/handler.rs` + `websocket/connection.rs` in the real-time game
//! server this pack also carries, adapted down to this crate's simpler
//! wire format: `{"event": "<name>", "payload": {...}}` in, one
//! `OutboundMessage` (already `{event, payload}`-shaped, see `fanout.rs`)
//! out per frame.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::routes::ServerContext;

const LOG_TARGET: &str = "server::ws";

#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<ServerContext>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<ServerContext>) {
    let session_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();
    let mut outbound = ctx.fanout.register(session_id.clone());

    ctx.dispatcher.handle_connect(&session_id, None).await;

    let send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let Ok(text) = serde_json::to_string(&message) else {
                warn!(target: LOG_TARGET, "failed to serialise outbound message");
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                debug!(target: LOG_TARGET, session_id = %session_id, %err, "websocket read error");
                break;
            }
        };
        match frame {
            Message::Text(text) => match serde_json::from_str::<InboundFrame>(&text) {
                Ok(InboundFrame { event, payload }) => {
                    ctx.dispatcher.dispatch(&session_id, &event, payload).await;
                }
                Err(err) => {
                    debug!(target: LOG_TARGET, session_id = %session_id, %err, "malformed inbound frame");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    ctx.fanout.unregister(&session_id);
    if let Err(err) = ctx.dispatcher.handle_disconnect(&session_id).await {
        warn!(target: LOG_TARGET, session_id = %session_id, %err, "error during disconnect cleanup");
    }
    info!(target: LOG_TARGET, session_id = %session_id, "connection closed");
}
