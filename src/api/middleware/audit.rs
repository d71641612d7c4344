//! Request logging middleware.
//!
//! Logs every API request with method, path, client IP, response status
//! and latency. Runs innermost, so rate-limited requests are not logged here.

use std::time::Instant;

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::client_ip;
use crate::api::types::ApiContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let trust_proxy = req
        .extensions()
        .get::<ApiContext>()
        .is_some_and(|ctx| ctx.core.config.trust_proxy);
    let client = client_ip(&req, trust_proxy);
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(%method, %path, %client, status, latency_ms, "Request failed");
    } else {
        tracing::info!(%method, %path, %client, status, latency_ms, "Request handled");
    }

    response
}
