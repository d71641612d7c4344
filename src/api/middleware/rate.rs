//! Per-client rate limiting middleware.
//!
//! Sliding-window limits per client IP, configured by
//! `RATE_LIMIT_PER_HOUR` and `RATE_LIMIT_PER_DAY`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::client_ip;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Per-client rate limiting. Returns 429 if exceeded.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = client_ip(&req, ctx.core.config.trust_proxy);

    // MutexGuard is !Send; drop it before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter.check(&key).map_err(|retry_after| {
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
            ApiError::RateLimited { retry_after }
        })?;
    }

    Ok(next.run(req).await)
}
