//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. CORS (tower-http, applied in the router)
//! 2. Rate limiter: reject early, per client IP
//! 3. Audit logger: one line per request with status and latency

pub mod audit;
pub mod rate;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::Request;

/// Client address for rate limiting and logs.
///
/// The socket peer, unless `trust_proxy` is set and the request carries
/// `X-Forwarded-For`, in which case its first hop.
pub(crate) fn client_ip<B>(req: &Request<B>, trust_proxy: bool) -> String {
    trust_proxy
        .then(|| forwarded_for(req))
        .flatten()
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}
