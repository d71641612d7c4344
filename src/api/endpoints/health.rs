//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::inference_service::ActiveOperation;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub environment: String,
    pub version: &'static str,
    pub llm: String,
    /// Model operation in flight, if any.
    pub ai_operation: Option<ActiveOperation>,
}

/// `GET /health` and `GET /api/health`.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
        environment: ctx.core.config.environment.clone(),
        version: crate::config::APP_VERSION,
        llm: ctx.core.llm().label(),
        ai_operation: ctx.core.current_operation(),
    })
}
