use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::db::{map_unique_violation, DatabaseError};
use crate::models::{Doctor, DoctorCredentials};

const DOCTOR_COLUMNS: &str =
    "id, license_id, full_name, specialization, verified, created_at, password_hash";

pub fn insert_doctor(
    conn: &Connection,
    doctor: &Doctor,
    password_hash: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, license_id, full_name, specialization, password_hash, verified, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.id.to_string(),
            doctor.license_id,
            doctor.full_name,
            doctor.specialization,
            password_hash,
            doctor.verified as i32,
            format_datetime(&doctor.created_at),
        ],
    )
    .map_err(|e| map_unique_violation(e, "doctor license already registered"))?;
    Ok(())
}

pub fn doctor_license_exists(conn: &Connection, license_id: &str) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM doctors WHERE license_id = ?1)",
        params![license_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn get_doctor_credentials_by_license(
    conn: &Connection,
    license_id: &str,
) -> Result<Option<DoctorCredentials>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE license_id = ?1");
    let row = conn
        .query_row(&sql, params![license_id], DoctorRow::read)
        .optional()?;
    match row {
        Some(row) => {
            let password_hash = row.password_hash.clone();
            Ok(Some(DoctorCredentials {
                doctor: doctor_from_row(row)?,
                password_hash,
            }))
        }
        None => Ok(None),
    }
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1");
    conn.query_row(&sql, params![id.to_string()], DoctorRow::read)
        .optional()?
        .map(doctor_from_row)
        .transpose()
}

pub fn doctor_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM doctors WHERE id = ?1)",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors ORDER BY created_at DESC, full_name");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], DoctorRow::read)?;
    rows.map(|r| doctor_from_row(r?)).collect()
}

/// Mark a doctor verified. Returns false when the doctor is unknown or
/// was already verified.
pub fn verify_doctor(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE doctors SET verified = 1 WHERE id = ?1 AND verified = 0",
        params![id.to_string()],
    )?;
    Ok(changed > 0)
}

struct DoctorRow {
    id: String,
    license_id: String,
    full_name: String,
    specialization: String,
    verified: i32,
    created_at: String,
    password_hash: String,
}

impl DoctorRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            license_id: row.get(1)?,
            full_name: row.get(2)?,
            specialization: row.get(3)?,
            verified: row.get(4)?,
            created_at: row.get(5)?,
            password_hash: row.get(6)?,
        })
    }
}

fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        id: parse_uuid(&row.id)?,
        license_id: row.license_id,
        full_name: row.full_name,
        specialization: row.specialization,
        verified: row.verified != 0,
        created_at: parse_datetime(&row.created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    fn sample_doctor(license: &str) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            license_id: license.into(),
            full_name: "Dr. Meera Iyer".into(),
            specialization: "Cardiology".into(),
            verified: false,
            created_at: crate::db::now_timestamp(),
        }
    }

    #[test]
    fn insert_and_fetch_doctor() {
        let conn = open_memory_database().unwrap();
        let doctor = sample_doctor("MED-12345");
        insert_doctor(&conn, &doctor, "hash").unwrap();
        assert_eq!(get_doctor(&conn, &doctor.id).unwrap().unwrap(), doctor);
        assert!(doctor_license_exists(&conn, "MED-12345").unwrap());
    }

    #[test]
    fn duplicate_license_rejected() {
        let conn = open_memory_database().unwrap();
        insert_doctor(&conn, &sample_doctor("MED-00001"), "h").unwrap();
        let err = insert_doctor(&conn, &sample_doctor("MED-00001"), "h").unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }

    #[test]
    fn verify_only_once() {
        let conn = open_memory_database().unwrap();
        let doctor = sample_doctor("MED-77777");
        insert_doctor(&conn, &doctor, "h").unwrap();

        assert!(verify_doctor(&conn, &doctor.id).unwrap());
        assert!(!verify_doctor(&conn, &doctor.id).unwrap());
        assert!(get_doctor(&conn, &doctor.id).unwrap().unwrap().verified);
        assert!(!verify_doctor(&conn, &Uuid::new_v4()).unwrap());
    }

    #[test]
    fn credentials_lookup_by_license() {
        let conn = open_memory_database().unwrap();
        let doctor = sample_doctor("MED-55555");
        insert_doctor(&conn, &doctor, "pw-hash").unwrap();
        let creds = get_doctor_credentials_by_license(&conn, "MED-55555")
            .unwrap()
            .unwrap();
        assert_eq!(creds.password_hash, "pw-hash");
        assert_eq!(list_doctors(&conn).unwrap().len(), 1);
    }
}
