pub mod bootstrap;
mod dto;
mod error;
mod logging;
pub mod routes;
mod ws;

pub use bootstrap::run_server;
pub use dto::{HealthResponse, RoomGameResponse};
pub use error::ApiError;
pub use routes::{AvalonServer, ServerContext};
