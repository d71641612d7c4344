//! HTTP router.
//!
//! Every route lives under `/api/`, with `/health` also at the root.
//!
//! Middleware stack (outermost → innermost):
//! 1. Extension → 2. CORS → 3. Rate limiter → 4. Audit logger

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::endpoints::{
    assignments, chat, consents, doctors, health, patients, reports, summary,
};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Room for multipart boundaries and text fields around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the API router over shared state.
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build the router from a pre-constructed `ApiContext`.
///
/// Middleware reads `Extension<ApiContext>` (outermost layer); handlers use
/// `State<ApiContext>` (via `with_state`).
pub fn build_router(ctx: ApiContext) -> Router {
    let upload_limit = ctx.core.config.max_upload_bytes + MULTIPART_OVERHEAD;

    // Routes that accept PDFs get a body limit sized to the upload cap.
    let uploads = Router::new()
        .route("/reports/upload", post(reports::upload))
        .route("/report/summary", post(summary::summary))
        .route("/report/extract", post(summary::extract))
        .route("/report/summarize", post(summary::summarize))
        .layer(DefaultBodyLimit::max(upload_limit));

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(health::check))
        .route("/patients", get(patients::list))
        .route("/patients/register", post(patients::register))
        .route("/patients/login", post(patients::login))
        .route("/patients/:id", get(patients::get))
        .route("/patients/:id/reports", get(reports::list_for_patient))
        .route("/patients/:id/consents", get(consents::list_for_patient))
        .route("/patients/:id/assignments", get(assignments::list_for_patient))
        .route("/doctors", get(doctors::list))
        .route("/doctors/register", post(doctors::register))
        .route("/doctors/login", post(doctors::login))
        .route("/doctors/:id", get(doctors::get))
        .route("/doctors/:id/verify", post(doctors::verify))
        .route("/doctors/:id/consents", get(consents::list_for_doctor))
        .route("/doctors/:id/assignments", get(assignments::list_for_doctor))
        .route("/reports", get(reports::list).post(reports::create))
        .route("/reports/search", get(reports::search))
        .route("/reports/:id", get(reports::get).delete(reports::delete))
        .route("/reports/:id/status", put(reports::update_status))
        .route("/reports/:id/ai", put(reports::update_ai))
        .route("/chat/ask", post(chat::ask))
        .route("/chat/history/:report_id", get(chat::history))
        .route(
            "/chat/history/:report_id/:history_id",
            axum::routing::delete(chat::delete_history),
        )
        .route("/consents", post(consents::create))
        .route("/consents/:id/revoke", post(consents::revoke))
        .route("/assignments", post(assignments::create))
        .merge(uploads);

    let cors = cors_layer(&ctx.core.config.allowed_origins);

    Router::new()
        .route("/health", get(health::check))
        .nest("/api", api)
        .with_state(ctx.clone())
        // Middleware stack (innermost first, outermost last):
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(cors)
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx))
}

/// CORS over the configured origins. A `*` entry allows any origin, without
/// credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION]);

    if origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let mut parsed = Vec::new();
    for origin in origins {
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => parsed.push(value),
            Err(err) => tracing::warn!("ignoring invalid CORS origin '{origin}': {err}"),
        }
    }
    base.allow_origin(AllowOrigin::list(parsed))
        .allow_credentials(true)
}
