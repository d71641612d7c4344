//! Patient endpoints.
//!
//! - `POST /api/patients/register`: create a patient (PIN hashed)
//! - `POST /api/patients/login`: email + PIN
//! - `GET /api/patients`, `GET /api/patients/:id`: public profiles

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_id;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::crypto::hash_secret;
use crate::db::repository;
use crate::models::Patient;
use crate::validation::{validate_patient_registration, PatientRegistration};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub patient_id: Uuid,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub pin: Option<String>,
}

#[derive(Serialize)]
pub struct PatientResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub patient: Patient,
}

#[derive(Serialize)]
pub struct PatientListResponse {
    pub success: bool,
    pub patients: Vec<Patient>,
}

/// `POST /api/patients/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<PatientRegistration>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let today = chrono::Local::now().date_naive();
    let valid = validate_patient_registration(&req, today)?;

    let patient_id = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            if repository::patient_email_exists(&conn, &valid.email)? {
                return Err(ApiError::Conflict(
                    "A patient with this email already exists".into(),
                ));
            }
            let pin_hash = hash_secret(&valid.pin, core.config.pbkdf2_iterations);
            let patient = Patient {
                id: Uuid::new_v4(),
                first_name: valid.first_name,
                last_name: valid.last_name,
                email: valid.email,
                phone: valid.phone,
                date_of_birth: valid.date_of_birth,
                created_at: repository::now_timestamp(),
            };
            repository::insert_patient(&conn, &patient, &pin_hash)?;
            Ok(patient.id)
        })
        .await?;

    tracing::info!(%patient_id, "Patient registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Patient registered successfully",
            patient_id,
        }),
    ))
}

/// `POST /api/patients/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<PatientResponse>, ApiError> {
    let email = req.email.as_deref().map(str::trim).unwrap_or_default().to_lowercase();
    let pin = req.pin.unwrap_or_default();
    if email.is_empty() || pin.is_empty() {
        return Err(ApiError::BadRequest("Email and PIN are required".into()));
    }

    let patient = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            let invalid = || ApiError::Unauthorized("Invalid email or PIN".into());
            let credentials = repository::get_patient_credentials_by_email(&conn, &email)?;
            let stored = credentials.as_ref().map(|c| c.pin_hash.as_str());
            if !core.verify_login_secret(&pin, stored)? {
                return Err(invalid());
            }
            credentials.map(|c| c.patient).ok_or_else(invalid)
        })
        .await?;

    tracing::info!(patient_id = %patient.id, "Patient logged in");
    Ok(Json(PatientResponse {
        success: true,
        message: Some("Login successful"),
        patient,
    }))
}

/// `GET /api/patients`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<PatientListResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = repository::list_patients(&conn)?;
    Ok(Json(PatientListResponse {
        success: true,
        patients,
    }))
}

/// `GET /api/patients/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientResponse>, ApiError> {
    let id = parse_id(&id, "Patient")?;
    let conn = ctx.core.open_db()?;
    let patient = repository::get_patient(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;
    Ok(Json(PatientResponse {
        success: true,
        message: None,
        patient,
    }))
}
