use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_date, format_datetime, parse_date, parse_datetime, parse_uuid};
use crate::db::{map_unique_violation, DatabaseError};
use crate::models::{Patient, PatientCredentials};

const PATIENT_COLUMNS: &str =
    "id, first_name, last_name, email, phone, date_of_birth, created_at, pin_hash";

pub fn insert_patient(
    conn: &Connection,
    patient: &Patient,
    pin_hash: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, email, phone, date_of_birth, pin_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.email,
            patient.phone,
            format_date(&patient.date_of_birth),
            pin_hash,
            format_datetime(&patient.created_at),
        ],
    )
    .map_err(|e| map_unique_violation(e, "patient email already registered"))?;
    Ok(())
}

pub fn patient_email_exists(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE email = ?1)",
        params![email],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Patient plus stored PIN hash, for login only.
pub fn get_patient_credentials_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<PatientCredentials>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE email = ?1");
    let row = conn
        .query_row(&sql, params![email], PatientRow::read)
        .optional()?;
    match row {
        Some(row) => {
            let pin_hash = row.pin_hash.clone();
            Ok(Some(PatientCredentials {
                patient: patient_from_row(row)?,
                pin_hash,
            }))
        }
        None => Ok(None),
    }
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], PatientRow::read)
        .optional()?
        .map(patient_from_row)
        .transpose()
}

pub fn patient_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM patients WHERE id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC, last_name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], PatientRow::read)?;
    rows.map(|r| patient_from_row(r?)).collect()
}

struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    date_of_birth: String,
    created_at: String,
    pin_hash: String,
}

impl PatientRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            date_of_birth: row.get(5)?,
            created_at: row.get(6)?,
            pin_hash: row.get(7)?,
        })
    }
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        phone: row.phone,
        date_of_birth: parse_date(&row.date_of_birth)?,
        created_at: parse_datetime(&row.created_at),
    })
}
