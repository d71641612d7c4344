//! Question answering over a processed report, plus its history.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::db::repository;
use crate::inference_service::OperationKind;
use crate::models::enums::ReportStatus;
use crate::models::QueryRecord;
use crate::pipeline::rag::{ReportRagPipeline, SourceRef};
use crate::pipeline::storage::vectordb::SqliteVectorStore;

/// Shortest question worth embedding.
const MIN_QUESTION_CHARS: usize = 3;

/// Upper bound for `?limit=` on history.
const MAX_HISTORY_LIMIT: u32 = 500;

#[derive(Deserialize)]
pub struct AskRequest {
    pub report_id: Option<String>,
    pub question: Option<String>,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub answer: String,
    pub report_id: String,
    pub sources: Vec<SourceRef>,
}

/// `POST /api/chat/ask`
pub async fn ask(
    State(ctx): State<ApiContext>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let (Some(report_id), Some(question)) = (req.report_id, req.question) else {
        return Err(ApiError::BadRequest("Missing required fields".into()));
    };
    if question.trim().chars().count() < MIN_QUESTION_CHARS {
        return Err(ApiError::BadRequest("Question too short".into()));
    }

    {
        let conn = ctx.core.open_db()?;
        let report = repository::get_report(&conn, &report_id)?
            .ok_or_else(|| ApiError::NotFound("Report not found".into()))?;
        if report.status != ReportStatus::Processed && report.status != ReportStatus::Reviewed {
            return Err(ApiError::BadRequest("Report not yet processed".into()));
        }
    }

    tracing::info!(report_id = %report_id, "Answering question");
    let rid = report_id.clone();
    let answer = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            let store = SqliteVectorStore::new(&conn);
            let label = core.llm().label();
            let answer = {
                let _guard = core
                    .inference()
                    .acquire(OperationKind::QuestionAnswering, &label)?;
                ReportRagPipeline::new(core.llm(), core.embedder(), &store, core.config.rag_top_k)
                    .answer(&rid, &question)?
            };
            repository::insert_query(&conn, &rid, &answer.question, &answer.text)?;
            Ok(answer)
        })
        .await?;

    Ok(Json(AskResponse {
        success: true,
        answer: answer.text,
        report_id,
        sources: answer.sources,
    }))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<QueryRecord>,
}

/// `GET /api/chat/history/:report_id`: newest first.
pub async fn history(
    State(ctx): State<ApiContext>,
    Path(report_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(repository::DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let conn = ctx.core.open_db()?;
    let data = repository::list_queries(&conn, &report_id, limit)?;
    Ok(Json(HistoryResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// `DELETE /api/chat/history/:report_id/:history_id`
pub async fn delete_history(
    State(ctx): State<ApiContext>,
    Path((report_id, history_id)): Path<(String, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !repository::delete_query(&conn, &report_id, history_id)? {
        return Err(ApiError::NotFound("Chat history entry not found".into()));
    }
    Ok(Json(MessageResponse::ok("Chat history deleted")))
}
