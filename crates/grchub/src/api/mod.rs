//! HTTP API module.
//!
//! Provides the knowledge endpoints and the streaming chat gateway.

mod chat;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
