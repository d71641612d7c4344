use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_datetime, parse_datetime, parse_uuid};
use crate::db::{map_unique_violation, DatabaseError};
use crate::models::enums::AssignmentStatus;
use crate::models::Assignment;

pub fn insert_assignment(conn: &Connection, assignment: &Assignment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO assignments (id, doctor_id, patient_id, status, assigned_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            assignment.id.to_string(),
            assignment.doctor_id.to_string(),
            assignment.patient_id.to_string(),
            assignment.status.as_str(),
            format_datetime(&assignment.assigned_at),
        ],
    )
    .map_err(|e| map_unique_violation(e, "doctor already assigned to patient"))?;
    Ok(())
}

pub fn list_assignments_by_doctor(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Assignment>, DatabaseError> {
    query_assignments(conn, "doctor_id", doctor_id)
}

pub fn list_assignments_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Assignment>, DatabaseError> {
    query_assignments(conn, "patient_id", patient_id)
}

fn query_assignments(
    conn: &Connection,
    column: &'static str,
    id: &Uuid,
) -> Result<Vec<Assignment>, DatabaseError> {
    let sql = format!(
        "SELECT id, doctor_id, patient_id, status, assigned_at FROM assignments
         WHERE {column} = ?1 ORDER BY assigned_at DESC, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    rows.map(|r| -> Result<Assignment, DatabaseError> {
        let (id, doctor_id, patient_id, status, assigned_at) = r?;
        Ok(Assignment {
            id: parse_uuid(&id)?,
            doctor_id: parse_uuid(&doctor_id)?,
            patient_id: parse_uuid(&patient_id)?,
            status: AssignmentStatus::from_str(&status)?,
            assigned_at: parse_datetime(&assigned_at),
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_doctor, insert_patient, now_timestamp, open_memory_database};
    use crate::models::{Doctor, Patient};
    use chrono::NaiveDate;

    fn setup() -> (Connection, Uuid, Uuid) {
        let conn = open_memory_database().unwrap();
        let patient = Patient {
            id: Uuid::new_v4(),
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: "asha@example.com".into(),
            phone: "9876543210".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 14).unwrap(),
            created_at: now_timestamp(),
        };
        let doctor = Doctor {
            id: Uuid::new_v4(),
            license_id: "MED-12345".into(),
            full_name: "Dr. Meera Iyer".into(),
            specialization: "Cardiology".into(),
            verified: true,
            created_at: now_timestamp(),
        };
        insert_patient(&conn, &patient, "h").unwrap();
        insert_doctor(&conn, &doctor, "h").unwrap();
        (conn, patient.id, doctor.id)
    }

    fn assignment(doctor_id: Uuid, patient_id: Uuid) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            status: AssignmentStatus::Active,
            assigned_at: now_timestamp(),
        }
    }

    #[test]
    fn assignment_listed_for_both_sides() {
        let (conn, patient_id, doctor_id) = setup();
        let a = assignment(doctor_id, patient_id);
        insert_assignment(&conn, &a).unwrap();

        assert_eq!(list_assignments_by_doctor(&conn, &doctor_id).unwrap(), vec![a.clone()]);
        assert_eq!(list_assignments_by_patient(&conn, &patient_id).unwrap(), vec![a]);
    }

    #[test]
    fn duplicate_pair_rejected() {
        let (conn, patient_id, doctor_id) = setup();
        insert_assignment(&conn, &assignment(doctor_id, patient_id)).unwrap();
        let err = insert_assignment(&conn, &assignment(doctor_id, patient_id)).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }
}
