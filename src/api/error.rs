//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core_state::CoreError;
use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::inference_service::InferenceServiceError;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::llm::LlmError;
use crate::pipeline::processor::ProcessingError;
use crate::pipeline::rag::RagError;
use crate::pipeline::storage::StorageError;
use crate::validation::ValidationError;

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Unauthorized(detail) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail.clone()),
            ApiError::PayloadTooLarge(detail) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                detail.clone(),
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Retry after {retry_after}s"),
            ),
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "AI service call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNAVAILABLE",
                    "AI service unavailable, please try again later".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            success: false,
            error: message,
            code,
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiError::RateLimited { retry_after } = &self {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => e.into(),
            CoreError::Llm(e) => ApiError::Internal(e.to_string()),
            CoreError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConstraintViolation(detail) => ApiError::Conflict(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.0)
    }
}

impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(detail) => ApiError::Internal(detail),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Database(e) => e.into(),
            StorageError::EmbeddingConnection(_) | StorageError::Embedding(_) => {
                ApiError::Upstream(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Extraction(ExtractionError::NoText) => {
                ApiError::BadRequest("No text could be extracted from the report".into())
            }
            ProcessingError::Extraction(ExtractionError::PdfParsing(detail)) => {
                ApiError::BadRequest(format!("Could not read PDF: {detail}"))
            }
            ProcessingError::Storage(e) => e.into(),
            ProcessingError::Database(e) => e.into(),
            ProcessingError::UnknownPatient(_) => ApiError::NotFound("Patient not found".into()),
            ProcessingError::EmptyText => ApiError::BadRequest("No text provided".into()),
            ProcessingError::Inference(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::EmptyQuestion => ApiError::BadRequest("Question too short".into()),
            RagError::EmbeddingFailed(detail) => ApiError::Upstream(detail),
            RagError::Llm(e) => e.into(),
            RagError::Database(e) => e.into(),
        }
    }
}

impl From<InferenceServiceError> for ApiError {
    fn from(err: InferenceServiceError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}
