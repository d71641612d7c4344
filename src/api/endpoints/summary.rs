//! Stateless analysis of a PDF or raw text.
//!
//! - `POST /api/report/summary`: extract fields, summarise, save the report
//! - `POST /api/report/extract`: fields only
//! - `POST /api/report/summarize`: summary only
//!
//! Each accepts a multipart `file` or JSON `{"text": ..., "file_name": ...}`.
//! No similarity index is built here.

use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::reports::read_pdf_upload;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::pipeline::extraction::PdfTextExtractor;
use crate::pipeline::processor::{AnalysisMode, ProcessingError, TextAnalysis};
use crate::pipeline::structuring::ExtractedReport;

const DEFAULT_TEXT_NAME: &str = "text_input";
const SUMMARY_FAILED: &str = "Summary generation failed";
const NO_INPUT: &str = "No file or text provided. Send a PDF file or JSON with 'text' field.";

#[derive(Deserialize)]
pub struct TextRequest {
    pub text: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub file_name: String,
    pub report_id: Option<String>,
    /// RFC 3339.
    pub processed_at: String,
    pub text_length: usize,
    pub summary: String,
    pub extracted_info: ExtractedReport,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub extracted_info: ExtractedReport,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub success: bool,
    pub summary: String,
}

/// `POST /api/report/summary`
pub async fn summary(
    State(ctx): State<ApiContext>,
    request: Request,
) -> Result<Json<SummaryResponse>, ApiError> {
    let (file_name, text) = read_report_text(&ctx, request).await?;
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "No text could be extracted from the report".into(),
        ));
    }

    let text_length = text.chars().count();
    let name = file_name.clone();
    let analysis = analyze(&ctx, name, text, AnalysisMode::Full).await?;

    Ok(Json(SummaryResponse {
        success: true,
        file_name,
        report_id: analysis.report_id,
        processed_at: chrono::Local::now().to_rfc3339(),
        text_length,
        summary: analysis.summary.unwrap_or_else(|| SUMMARY_FAILED.to_string()),
        extracted_info: analysis.extracted.unwrap_or_default(),
    }))
}

/// `POST /api/report/extract`
pub async fn extract(
    State(ctx): State<ApiContext>,
    request: Request,
) -> Result<Json<ExtractResponse>, ApiError> {
    let (file_name, text) = read_report_text(&ctx, request).await?;
    let analysis = analyze(&ctx, file_name, text, AnalysisMode::ExtractOnly).await?;
    Ok(Json(ExtractResponse {
        success: true,
        extracted_info: analysis.extracted.unwrap_or_default(),
    }))
}

/// `POST /api/report/summarize`
pub async fn summarize(
    State(ctx): State<ApiContext>,
    request: Request,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let (file_name, text) = read_report_text(&ctx, request).await?;
    let analysis = analyze(&ctx, file_name, text, AnalysisMode::SummaryOnly).await?;
    Ok(Json(SummarizeResponse {
        success: true,
        summary: analysis.summary.unwrap_or_else(|| SUMMARY_FAILED.to_string()),
    }))
}

async fn analyze(
    ctx: &ApiContext,
    file_name: String,
    text: String,
    mode: AnalysisMode,
) -> Result<TextAnalysis, ApiError> {
    ctx.blocking(move |core| {
        let conn = core.open_db()?;
        Ok(core
            .processor()
            .analyze_text(&conn, &file_name, &text, mode, repository::now_timestamp())?)
    })
    .await
}

/// Pull `(file_name, text)` out of a multipart PDF or a JSON body.
async fn read_report_text(
    ctx: &ApiContext,
    request: Request,
) -> Result<(String, String), ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let upload = read_pdf_upload(multipart, ctx.core.config.max_upload_bytes).await?;
        let file_name = upload.file_name;
        let text = ctx
            .blocking(move |_| {
                PdfTextExtractor
                    .extract(&upload.bytes)
                    .map(|extracted| extracted.text)
                    .map_err(|e| ProcessingError::from(e).into())
            })
            .await?;
        return Ok((file_name, text));
    }

    if content_type.starts_with("application/json") {
        let Json(body) = Json::<TextRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let file_name = body
            .file_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEXT_NAME.to_string());
        return Ok((file_name, body.text.unwrap_or_default()));
    }

    Err(ApiError::BadRequest(NO_INPUT.into()))
}
