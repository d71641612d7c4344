//! Doctor-to-patient care assignments.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_body_id, parse_id};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::repository;
use crate::models::enums::AssignmentStatus;
use crate::models::Assignment;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    pub doctor_id: Option<String>,
    pub patient_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentResponse {
    pub success: bool,
    pub assignment_id: Uuid,
}

#[derive(Serialize)]
pub struct AssignmentListResponse {
    pub success: bool,
    pub assignments: Vec<Assignment>,
}

/// `POST /api/assignments`: one assignment per doctor/patient pair.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<CreateAssignmentResponse>), ApiError> {
    let (Some(doctor_id), Some(patient_id)) = (
        req.doctor_id.filter(|v| !v.trim().is_empty()),
        req.patient_id.filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "doctorId and patientId are required".into(),
        ));
    };
    let doctor_id = parse_body_id(doctor_id.trim(), "doctorId")?;
    let patient_id = parse_body_id(patient_id.trim(), "patientId")?;

    let conn = ctx.core.open_db()?;
    if !repository::doctor_exists(&conn, &doctor_id)? {
        return Err(ApiError::NotFound("Doctor not found".into()));
    }
    if !repository::patient_exists(&conn, &patient_id)? {
        return Err(ApiError::NotFound("Patient not found".into()));
    }

    let assignment = Assignment {
        id: Uuid::new_v4(),
        doctor_id,
        patient_id,
        status: AssignmentStatus::Active,
        assigned_at: repository::now_timestamp(),
    };
    repository::insert_assignment(&conn, &assignment)?;

    tracing::info!(assignment_id = %assignment.id, %doctor_id, %patient_id, "Doctor assigned");
    Ok((
        StatusCode::CREATED,
        Json(CreateAssignmentResponse {
            success: true,
            assignment_id: assignment.id,
        }),
    ))
}

/// `GET /api/doctors/:id/assignments`
pub async fn list_for_doctor(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<AssignmentListResponse>, ApiError> {
    let doctor_id = parse_id(&id, "Doctor")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(AssignmentListResponse {
        success: true,
        assignments: repository::list_assignments_by_doctor(&conn, &doctor_id)?,
    }))
}

/// `GET /api/patients/:id/assignments`
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<AssignmentListResponse>, ApiError> {
    let patient_id = parse_id(&id, "Patient")?;
    let conn = ctx.core.open_db()?;
    Ok(Json(AssignmentListResponse {
        success: true,
        assignments: repository::list_assignments_by_patient(&conn, &patient_id)?,
    }))
}
