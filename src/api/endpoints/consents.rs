//! Patient-to-doctor access grants.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_body_id, parse_id};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::db::repository;
use crate::models::enums::ConsentStatus;
use crate::models::Consent;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsentRequest {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsentResponse {
    pub success: bool,
    pub consent_id: Uuid,
}

/// A consent with its activity evaluated for today.
#[derive(Serialize)]
pub struct ConsentView {
    #[serde(flatten)]
    pub consent: Consent,
    pub active: bool,
}

#[derive(Serialize)]
pub struct ConsentListResponse {
    pub success: bool,
    pub consents: Vec<ConsentView>,
}

/// `POST /api/consents`
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateConsentRequest>,
) -> Result<(StatusCode, Json<CreateConsentResponse>), ApiError> {
    let patient_id = parse_body_id(&required(req.patient_id, "patientId")?, "patientId")?;
    let doctor_id = parse_body_id(&required(req.doctor_id, "doctorId")?, "doctorId")?;
    let permissions: Vec<String> = req
        .permissions
        .unwrap_or_default()
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if permissions.is_empty() {
        return Err(ApiError::BadRequest("permissions is required".into()));
    }
    let start_date = parse_date(&required(req.start_date, "startDate")?, "startDate")?;
    let end_date = parse_date(&required(req.end_date, "endDate")?, "endDate")?;
    if start_date > end_date {
        return Err(ApiError::BadRequest(
            "startDate must not be after endDate".into(),
        ));
    }

    let conn = ctx.core.open_db()?;
    if !repository::patient_exists(&conn, &patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }
    if !repository::doctor_exists(&conn, &doctor_id)? {
        return Err(ApiError::NotFound("Doctor not found".into()));
    }

    let consent = Consent {
        id: Uuid::new_v4(),
        patient_id,
        doctor_id,
        permissions,
        start_date,
        end_date,
        status: ConsentStatus::Active,
        created_at: repository::now_timestamp(),
        revoked_at: None,
    };
    repository::insert_consent(&conn, &consent)?;

    tracing::info!(consent_id = %consent.id, %patient_id, %doctor_id, "Consent granted");
    Ok((
        StatusCode::CREATED,
        Json(CreateConsentResponse {
            success: true,
            consent_id: consent.id,
        }),
    ))
}

/// `GET /api/patients/:id/consents`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ConsentListResponse>, ApiError> {
    let patient_id = parse_id(&id, "Patient")?;
    let conn = ctx.core.open_db()?;
    let consents = repository::list_consents_by_patient(&conn, &patient_id)?;
    Ok(Json(with_activity(consents)))
}

/// `GET /api/doctors/:id/consents`
pub async fn list_for_doctor(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ConsentListResponse>, ApiError> {
    let doctor_id = parse_id(&id, "Doctor")?;
    let conn = ctx.core.open_db()?;
    let consents = repository::list_consents_by_doctor(&conn, &doctor_id)?;
    Ok(Json(with_activity(consents)))
}

/// `POST /api/consents/:id/revoke`
pub async fn revoke(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let consent_id = parse_id(&id, "Consent")?;
    let conn = ctx.core.open_db()?;
    if !repository::revoke_consent(&conn, &consent_id)? {
        return Err(ApiError::NotFound("Consent not found".into()));
    }
    tracing::info!(%consent_id, "Consent revoked");
    Ok(Json(MessageResponse::ok("Consent revoked")))
}

fn with_activity(consents: Vec<Consent>) -> ConsentListResponse {
    let today = chrono::Local::now().date_naive();
    ConsentListResponse {
        success: true,
        consents: consents
            .into_iter()
            .map(|consent| ConsentView {
                active: consent.is_active_on(today),
                consent,
            })
            .collect(),
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{field} must be a YYYY-MM-DD date")))
}
