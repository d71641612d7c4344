//! Report endpoints.
//!
//! Uploads run the full PDF pipeline on the blocking pool. Everything else is
//! plain CRUD over the `reports` table.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_body_id, parse_id};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::db::repository;
use crate::models::enums::ReportStatus;
use crate::models::{Report, ReportAiUpdate, ReportDetail};
use crate::pipeline::extraction::looks_like_pdf;
use crate::pipeline::processor::UploadInput;
use crate::pipeline::structuring::prompt::truncate_chars;

/// Characters of summary echoed in the upload response.
const UPLOAD_SUMMARY_PREVIEW: usize = 500;

/// Upper bound for `?limit=` on listings.
const MAX_LIST_LIMIT: u32 = 1000;

/// File name stored on records created without an upload.
const MANUAL_RECORD_NAME: &str = "patient_record";

// ── Multipart PDF intake ────────────────────────────────────

/// A PDF pulled out of a multipart form, plus its text fields.
pub(crate) struct PdfUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

/// Read the `file` part and any text fields from a multipart body.
pub(crate) async fn read_pdf_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<PdfUpload, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut fields = HashMap::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            file = Some((file_name, bytes.to_vec()));
        } else if !name.is_empty() {
            let value = field.text().await.map_err(multipart_error)?;
            fields.insert(name, value);
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| ApiError::BadRequest("No file provided".into()))?;
    if file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("No file selected".into()));
    }
    if !file_name.to_ascii_lowercase().ends_with(".pdf") || !looks_like_pdf(&bytes) {
        return Err(ApiError::BadRequest("Only PDF files allowed".into()));
    }
    if bytes.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge("File too large".into()));
    }

    Ok(PdfUpload {
        file_name,
        bytes,
        fields,
    })
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large".into())
    } else {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
    }
}

// ── Upload ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub report_id: String,
    pub message: &'static str,
    pub patient_name: Option<String>,
    pub diagnosis: Option<String>,
    pub summary: String,
    pub page_count: usize,
    pub chunks_indexed: usize,
    pub test_results_saved: usize,
}

/// `POST /api/reports/upload`: multipart `file` (+ optional `patient_id`).
pub async fn upload(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_pdf_upload(multipart, ctx.core.config.max_upload_bytes).await?;
    let owner_patient_id = upload
        .fields
        .get("patient_id")
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| parse_body_id(v, "patient_id"))
        .transpose()?;

    tracing::info!(file = %upload.file_name, bytes = upload.bytes.len(), "Processing uploaded report");

    let processed = ctx
        .blocking(move |core| {
            let mut conn = core.open_db()?;
            let input = UploadInput {
                file_name: &upload.file_name,
                pdf_bytes: &upload.bytes,
                owner_patient_id,
            };
            Ok(core
                .processor()
                .process_report(&mut conn, &input, repository::now_timestamp())?)
        })
        .await?;

    let summary = processed.report.summary.clone().unwrap_or_default();
    let preview = if summary.chars().count() > UPLOAD_SUMMARY_PREVIEW {
        format!("{}...", truncate_chars(&summary, UPLOAD_SUMMARY_PREVIEW))
    } else {
        summary
    };

    Ok(Json(UploadResponse {
        success: true,
        report_id: processed.report.id,
        message: "Report processed successfully",
        patient_name: processed.report.patient_name,
        diagnosis: processed.report.diagnosis,
        summary: preview,
        page_count: processed.page_count,
        chunks_indexed: processed.chunks_indexed,
        test_results_saved: processed.test_results_saved,
    }))
}

// ── Patient-created records ─────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub patient_id: Option<String>,
    pub file_name: Option<String>,
    pub report_type: Option<String>,
    pub report_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportResponse {
    pub success: bool,
    pub report_id: String,
}

/// `POST /api/reports`: empty pending record owned by a patient.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<CreateReportResponse>), ApiError> {
    let patient_id = req
        .patient_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest("patientId is required".into()))?;
    let patient_id = parse_body_id(patient_id, "patientId")?;

    let conn = ctx.core.open_db()?;
    if !repository::patient_exists(&conn, &patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }

    let file_name = non_empty(req.file_name).unwrap_or_else(|| MANUAL_RECORD_NAME.to_string());
    let mut report = Report::new(&file_name, repository::now_timestamp());
    report.owner_patient_id = Some(patient_id);
    report.report_date = non_empty(req.report_date);
    if let Some(report_type) = non_empty(req.report_type) {
        report.report_type = report_type;
    }
    repository::insert_report(&conn, &report)?;

    tracing::info!(report_id = %report.id, %patient_id, "Report record created");
    Ok((
        StatusCode::CREATED,
        Json(CreateReportResponse {
            success: true,
            report_id: report.id,
        }),
    ))
}

// ── Reads ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct ReportListResponse {
    pub success: bool,
    pub count: usize,
    pub reports: Vec<Report>,
}

impl ReportListResponse {
    fn new(reports: Vec<Report>) -> Self {
        Self {
            success: true,
            count: reports.len(),
            reports,
        }
    }
}

#[derive(Serialize)]
pub struct ReportDetailResponse {
    pub success: bool,
    pub report: ReportDetail,
}

/// `GET /api/reports?limit=`: newest first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let limit = list_limit(query.limit);
    let conn = ctx.core.open_db()?;
    Ok(Json(ReportListResponse::new(repository::list_reports(&conn, limit)?)))
}

/// `GET /api/reports/search?q=`
pub async fn search(
    State(ctx): State<ApiContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let q = non_empty(query.q).ok_or_else(|| ApiError::BadRequest("Search query is required".into()))?;
    let conn = ctx.core.open_db()?;
    let reports = repository::search_reports(&conn, &q, list_limit(query.limit))?;
    Ok(Json(ReportListResponse::new(reports)))
}

/// `GET /api/reports/:id`: report with its test results.
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ReportDetailResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let report = repository::get_report(&conn, &id)?.ok_or_else(report_not_found)?;
    let test_results = repository::get_test_results(&conn, &id)?;
    Ok(Json(ReportDetailResponse {
        success: true,
        report: ReportDetail {
            report,
            test_results,
        },
    }))
}

/// `GET /api/patients/:id/reports`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let patient_id = parse_id(&patient_id, "Patient")?;
    let conn = ctx.core.open_db()?;
    if !repository::patient_exists(&conn, &patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }
    let reports = repository::list_reports_by_patient(&conn, &patient_id)?;
    Ok(Json(ReportListResponse::new(reports)))
}

// ── Mutations ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

/// `DELETE /api/reports/:id`: test results, history and index go with it.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    if !repository::delete_report(&conn, &id)? {
        return Err(report_not_found());
    }
    tracing::info!(report_id = %id, "Report deleted");
    Ok(Json(MessageResponse::ok("Report deleted successfully")))
}

/// `PUT /api/reports/:id/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let raw = non_empty(req.status).ok_or_else(|| ApiError::BadRequest("status is required".into()))?;
    let status = ReportStatus::from_str(&raw.to_ascii_lowercase())
        .map_err(|_| ApiError::BadRequest(format!("Invalid status: {raw}")))?;

    let conn = ctx.core.open_db()?;
    if !repository::update_report_status(&conn, &id, status)? {
        return Err(report_not_found());
    }
    Ok(Json(MessageResponse::ok("Status updated")))
}

/// `PUT /api/reports/:id/ai`: partial update of AI-derived fields.
pub async fn update_ai(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(update): Json<ReportAiUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    if update.is_empty() {
        return Err(ApiError::BadRequest("No AI fields provided".into()));
    }
    let conn = ctx.core.open_db()?;
    if !repository::update_report_ai_data(&conn, &id, &update)? {
        return Err(report_not_found());
    }
    Ok(Json(MessageResponse::ok("AI data updated")))
}

fn report_not_found() -> ApiError {
    ApiError::NotFound("Report not found".into())
}

fn list_limit(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(repository::DEFAULT_REPORT_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
