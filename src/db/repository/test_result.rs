use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::TestStatus;
use crate::models::{NewTestResult, TestResult};

pub fn insert_test_results(
    conn: &Connection,
    report_id: &str,
    results: &[NewTestResult],
) -> Result<usize, DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO test_results (report_id, test_name, test_value, unit, normal_range, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for result in results {
        stmt.execute(params![
            report_id,
            result.test_name,
            result.test_value,
            result.unit,
            result.normal_range,
            result.status.as_str(),
        ])?;
    }
    Ok(results.len())
}

pub fn get_test_results(conn: &Connection, report_id: &str) -> Result<Vec<TestResult>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, test_name, test_value, unit, normal_range, status
         FROM test_results WHERE report_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![report_id], |row| {
        Ok(TestResult {
            id: row.get(0)?,
            report_id: row.get(1)?,
            test_name: row.get(2)?,
            test_value: row.get(3)?,
            unit: row.get(4)?,
            normal_range: row.get(5)?,
            status: TestStatus::from_str(&row.get::<_, String>(6)?).unwrap_or(TestStatus::Unknown),
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_report, now_timestamp, open_memory_database};
    use crate::models::Report;

    fn hemoglobin() -> NewTestResult {
        NewTestResult {
            test_name: "Hemoglobin".into(),
            test_value: Some("10.2".into()),
            unit: Some("g/dL".into()),
            normal_range: Some("12-16".into()),
            status: TestStatus::Abnormal,
        }
    }

    #[test]
    fn results_round_trip_in_order() {
        let conn = open_memory_database().unwrap();
        let report = Report::new("r.pdf", now_timestamp());
        insert_report(&conn, &report).unwrap();

        let mut second = hemoglobin();
        second.test_name = "WBC".into();
        second.status = TestStatus::Normal;
        assert_eq!(insert_test_results(&conn, &report.id, &[hemoglobin(), second]).unwrap(), 2);

        let stored = get_test_results(&conn, &report.id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].test_name, "Hemoglobin");
        assert_eq!(stored[0].status, TestStatus::Abnormal);
        assert_eq!(stored[1].test_name, "WBC");
    }

    #[test]
    fn results_cascade_with_report() {
        let conn = open_memory_database().unwrap();
        let report = Report::new("r.pdf", now_timestamp());
        insert_report(&conn, &report).unwrap();
        insert_test_results(&conn, &report.id, &[hemoglobin()]).unwrap();

        crate::db::delete_report(&conn, &report.id).unwrap();
        assert!(get_test_results(&conn, &report.id).unwrap().is_empty());
    }

    #[test]
    fn unknown_report_is_foreign_key_error() {
        let conn = open_memory_database().unwrap();
        assert!(insert_test_results(&conn, "RPT-none", &[hemoglobin()]).is_err());
    }
}
