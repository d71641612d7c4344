//! HTTP API.
//!
//! Routes are nested under `/api/` behind CORS, a per-client rate limiter
//! and an access logger. `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{ApiServer, ServerError, ServerSession};
pub use types::ApiContext;
