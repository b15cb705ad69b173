//! Router wiring. Grounded on the teacher's `LegitPokerServer`/
//! `ServerContext` shape (`server/routes.rs`): a small context struct holding
//! the shared services behind `Arc`, installed as axum `State`, plus the
//! logging middleware layer and a permissive CORS layer the teacher also
//! installs. The poker server's HTTP-only routes (snapshot/messages
//! queries) are replaced here by the websocket upgrade endpoint, since this
//! crate's entire external interface is event-driven (§6.1/§6.2); a couple
//! of plain HTTP endpoints remain for health checks and room bootstrap
//! lookups that a frontend needs before it has a socket open.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::middleware;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::dispatcher::Dispatcher;
use crate::fanout::Fanout;
use crate::registry::GameRegistry;

use super::dto::{HealthResponse, RoomGameResponse};
use super::error::ApiError;
use super::ws::websocket_handler;

#[derive(Clone)]
pub struct ServerContext {
    pub dispatcher: Arc<Dispatcher>,
    pub fanout: Arc<Fanout>,
    pub games: Arc<GameRegistry>,
}

pub struct AvalonServer {
    router: Router,
}

impl AvalonServer {
    pub fn new(ctx: ServerContext) -> Self {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let router = Router::new()
            .route("/healthz", get(health))
            .route("/rooms/:room_id/game", get(room_game))
            .route("/ws", get(websocket_handler))
            .layer(middleware::from_fn(super::logging::log_requests))
            .layer(cors)
            .with_state(Arc::new(ctx));

        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn room_game(
    State(ctx): State<Arc<ServerContext>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomGameResponse>, ApiError> {
    let game_id = ctx
        .games
        .game_id_for_room(&room_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(RoomGameResponse { room_id, game_id }))
}
