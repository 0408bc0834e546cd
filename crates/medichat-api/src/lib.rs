//! MediChat API crate - axum HTTP server, route handlers, SSE streaming.
//!
//! Exposes the forwarding chat and appointment endpoints, the streamed chat
//! endpoint, and the conversation endpoints backed by the orchestrator.

pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
