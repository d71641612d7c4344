use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_date, format_datetime, now_timestamp, parse_date, parse_datetime, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::ConsentStatus;
use crate::models::Consent;

const CONSENT_COLUMNS: &str =
    "id, patient_id, doctor_id, permissions, start_date, end_date, status, created_at, revoked_at";

pub fn insert_consent(conn: &Connection, consent: &Consent) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO consents (id, patient_id, doctor_id, permissions, start_date, end_date,
            status, created_at, revoked_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            consent.id.to_string(),
            consent.patient_id.to_string(),
            consent.doctor_id.to_string(),
            serde_json::to_string(&consent.permissions)?,
            format_date(&consent.start_date),
            format_date(&consent.end_date),
            consent.status.as_str(),
            format_datetime(&consent.created_at),
            consent.revoked_at.as_ref().map(format_datetime),
        ],
    )?;
    Ok(())
}

pub fn list_consents_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Consent>, DatabaseError> {
    query_consents(conn, "patient_id", patient_id)
}

pub fn list_consents_by_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Consent>, DatabaseError> {
    query_consents(conn, "doctor_id", doctor_id)
}

/// Revoke an active consent. Returns false when unknown or already revoked.
pub fn revoke_consent(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE consents SET status = 'revoked', revoked_at = ?1
         WHERE id = ?2 AND status = 'active'",
        params![format_datetime(&now_timestamp()), id.to_string()],
    )?;
    Ok(changed > 0)
}

fn query_consents(
    conn: &Connection,
    column: &'static str,
    id: &Uuid,
) -> Result<Vec<Consent>, DatabaseError> {
    let sql = format!(
        "SELECT {CONSENT_COLUMNS} FROM consents WHERE {column} = ?1 ORDER BY created_at DESC, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        Ok(ConsentRow {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            permissions: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            revoked_at: row.get(8)?,
        })
    })?;
    rows.map(|r| consent_from_row(r?)).collect()
}

struct ConsentRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    permissions: String,
    start_date: String,
    end_date: String,
    status: String,
    created_at: String,
    revoked_at: Option<String>,
}

fn consent_from_row(row: ConsentRow) -> Result<Consent, DatabaseError> {
    Ok(Consent {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        permissions: serde_json::from_str(&row.permissions)?,
        start_date: parse_date(&row.start_date)?,
        end_date: parse_date(&row.end_date)?,
        status: ConsentStatus::from_str(&row.status)?,
        created_at: parse_datetime(&row.created_at),
        revoked_at: row.revoked_at.as_deref().map(parse_datetime),
    })
}
