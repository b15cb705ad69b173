//! Process wiring: cache backend, registries, dispatcher, router, listener.
//! Mirrors the shape of the teacher's `run_server` (bind a listener, build
//! the service stack, serve with graceful shutdown) without the ledger/
//! SeaORM/Supabase machinery that stack needed — this crate's only external
//! collaborator is the `RoomDirectory` trait (§12), so there is no database
//! connection to establish here.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::cache::{GameCache, InMemoryCache, RedisCache};
use crate::config::Config;
use crate::directory::{InMemoryRoomDirectory, RoomDirectory};
use crate::dispatcher::Dispatcher;
use crate::fanout::Fanout;
use crate::registry::{ConnectionRegistry, GameRegistry, RoomMembership};

use super::routes::{AvalonServer, ServerContext};

const LOG_TARGET: &str = "server::bootstrap";

pub async fn run_server(config: Config) -> Result<()> {
    let cache: Arc<dyn GameCache> = match &config.redis_url {
        Some(url) => {
            info!(target: LOG_TARGET, "connecting to redis cache");
            Arc::new(
                RedisCache::connect(url)
                    .await
                    .context("failed to connect to redis cache")?,
            )
        }
        None => {
            info!(target: LOG_TARGET, "no CACHE_REDIS_URL set; using in-memory cache");
            Arc::new(InMemoryCache::new())
        }
    };

    let directory: Arc<dyn RoomDirectory> = Arc::new(InMemoryRoomDirectory::new());

    let connections = Arc::new(ConnectionRegistry::with_ttl(Duration::from_secs(
        config.session_ttl_secs,
    )));
    let games = Arc::new(GameRegistry::new(Arc::clone(&cache)));
    let membership = Arc::new(RoomMembership::new(Arc::clone(&cache), Arc::clone(&directory)));
    let fanout = Arc::new(Fanout::new());

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&connections),
        Arc::clone(&games),
        Arc::clone(&membership),
        Arc::clone(&directory),
        Arc::clone(&fanout),
    ));

    let ctx = ServerContext {
        dispatcher,
        fanout,
        games: Arc::clone(&games),
    };

    let server = AvalonServer::new(ctx);
    let router = server.into_router();

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener.local_addr()?;
    info!(target: LOG_TARGET, %local_addr, "avalon server listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")
}

async fn shutdown_signal() {
    use tracing::warn;

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target: LOG_TARGET, error = %err, "failed to install ctrl-c handler");
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}
