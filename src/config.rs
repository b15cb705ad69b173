//! Process configuration, built with `clap` the same way the teacher's
//! `bin/legit_poker_server.rs` builds its `Args`/`ServerConfig` pair, loading
//! `.env` first via `dotenv`. No database URL is required (§10.3): the only
//! external collaborator, the room directory, is reached through a trait
//! supplied by the embedding application, not a connection string owned by
//! this crate.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

const DEFAULT_BIND: &str = "127.0.0.1:4000";
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const DEFAULT_ROOM_STATE_TTL_SECS: u64 = 3_600;

#[derive(Debug, Parser)]
#[command(name = "avalon_server")]
#[command(about = "Avalon real-time game coordinator", long_about = None)]
pub struct Config {
    /// Address to bind the HTTP/WebSocket server to (host:port).
    #[arg(long, env = "SERVER_BIND", default_value = DEFAULT_BIND)]
    pub bind: SocketAddr,

    /// Redis connection URL for the durable cache. Omit to run with the
    /// in-memory cache (fine for a single process / local development).
    #[arg(long, env = "CACHE_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Connection session mirror TTL, seconds (§6.3).
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = DEFAULT_SESSION_TTL_SECS)]
    pub session_ttl_secs: u64,

    /// Room metadata TTL, seconds (§6.3).
    #[arg(long, env = "ROOM_STATE_TTL_SECS", default_value_t = DEFAULT_ROOM_STATE_TTL_SECS)]
    pub room_state_ttl_secs: u64,

    /// Toggle structured (JSON) logs.
    #[arg(long, env = "SERVER_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Config {
    pub fn load() -> Self {
        load_dotenv();
        Config::parse()
    }
}

fn load_dotenv() {
    let manifest_env = env!("CARGO_MANIFEST_DIR");
    let manifest_env_path = PathBuf::from(manifest_env).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}
