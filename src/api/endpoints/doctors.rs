//! Doctor endpoints.
//!
//! Doctors register unverified; `POST /api/doctors/:id/verify` flips the flag once.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parse_id;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MessageResponse};
use crate::crypto::hash_secret;
use crate::db::repository;
use crate::models::Doctor;
use crate::validation::{validate_doctor_registration, DoctorRegistration};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: &'static str,
    pub doctor_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub license_id: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct DoctorResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub doctor: Doctor,
}

#[derive(Serialize)]
pub struct DoctorListResponse {
    pub success: bool,
    pub doctors: Vec<Doctor>,
}

/// `POST /api/doctors/register`
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<DoctorRegistration>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let valid = validate_doctor_registration(&req)?;

    let doctor_id = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            if repository::doctor_license_exists(&conn, &valid.license_id)? {
                return Err(ApiError::Conflict(
                    "A doctor with this license ID already exists".into(),
                ));
            }
            let password_hash = hash_secret(&valid.password, core.config.pbkdf2_iterations);
            let doctor = Doctor {
                id: Uuid::new_v4(),
                license_id: valid.license_id,
                full_name: valid.full_name,
                specialization: valid.specialization,
                verified: false,
                created_at: repository::now_timestamp(),
            };
            repository::insert_doctor(&conn, &doctor, &password_hash)?;
            Ok(doctor.id)
        })
        .await?;

    tracing::info!(%doctor_id, "Doctor registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Doctor registered successfully. Pending verification.",
            doctor_id,
        }),
    ))
}

/// `POST /api/doctors/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let license_id = req.license_id.as_deref().map(str::trim).unwrap_or_default().to_string();
    let password = req.password.unwrap_or_default();
    if license_id.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("License ID and password are required".into()));
    }

    let doctor = ctx
        .blocking(move |core| {
            let conn = core.open_db()?;
            let invalid = || ApiError::Unauthorized("Invalid license ID or password".into());
            let credentials = repository::get_doctor_credentials_by_license(&conn, &license_id)?;
            let stored = credentials.as_ref().map(|c| c.password_hash.as_str());
            if !core.verify_login_secret(&password, stored)? {
                return Err(invalid());
            }
            credentials.map(|c| c.doctor).ok_or_else(invalid)
        })
        .await?;

    tracing::info!(doctor_id = %doctor.id, "Doctor logged in");
    Ok(Json(DoctorResponse {
        success: true,
        message: Some("Login successful"),
        doctor,
    }))
}

/// `GET /api/doctors`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<DoctorListResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let doctors = repository::list_doctors(&conn)?;
    Ok(Json(DoctorListResponse {
        success: true,
        doctors,
    }))
}

/// `GET /api/doctors/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let id = parse_id(&id, "Doctor")?;
    let conn = ctx.core.open_db()?;
    let doctor = repository::get_doctor(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound("Doctor not found".into()))?;
    Ok(Json(DoctorResponse {
        success: true,
        message: None,
        doctor,
    }))
}

/// `POST /api/doctors/:id/verify`
pub async fn verify(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let not_found = || ApiError::NotFound("Doctor not found or already verified".into());
    let id = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
    let conn = ctx.core.open_db()?;
    if !repository::verify_doctor(&conn, &id)? {
        return Err(not_found());
    }
    tracing::info!(doctor_id = %id, "Doctor verified");
    Ok(Json(MessageResponse::ok("Doctor verified successfully")))
}
