use rusqlite::{params, Connection};

use super::{format_datetime, parse_datetime};
use crate::db::DatabaseError;
use crate::models::QueryRecord;

/// Default page size for history listings.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

pub fn insert_query(
    conn: &Connection,
    report_id: &str,
    question: &str,
    answer: &str,
) -> Result<QueryRecord, DatabaseError> {
    let asked_at = super::now_timestamp();
    conn.execute(
        "INSERT INTO query_history (report_id, question, answer, asked_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![report_id, question, answer, format_datetime(&asked_at)],
    )?;
    Ok(QueryRecord {
        id: conn.last_insert_rowid(),
        report_id: report_id.to_string(),
        question: question.to_string(),
        answer: answer.to_string(),
        asked_at,
    })
}

/// Newest first.
pub fn list_queries(
    conn: &Connection,
    report_id: &str,
    limit: u32,
) -> Result<Vec<QueryRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_id, question, answer, asked_at FROM query_history
         WHERE report_id = ?1 ORDER BY asked_at DESC, id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![report_id, limit], |row| {
        Ok(QueryRecord {
            id: row.get(0)?,
            report_id: row.get(1)?,
            question: row.get(2)?,
            answer: row.get(3)?,
            asked_at: parse_datetime(&row.get::<_, String>(4)?),
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Delete one history entry, scoped to its report.
pub fn delete_query(conn: &Connection, report_id: &str, id: i64) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM query_history WHERE id = ?1 AND report_id = ?2",
        params![id, report_id],
    )?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_report, now_timestamp, open_memory_database};
    use crate::models::Report;

    fn setup() -> (Connection, String) {
        let conn = open_memory_database().unwrap();
        let report = Report::new("r.pdf", now_timestamp());
        insert_report(&conn, &report).unwrap();
        (conn, report.id)
    }

    #[test]
    fn history_newest_first() {
        let (conn, report_id) = setup();
        insert_query(&conn, &report_id, "first?", "a1").unwrap();
        insert_query(&conn, &report_id, "second?", "a2").unwrap();

        let history = list_queries(&conn, &report_id, DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "second?");
    }

    #[test]
    fn history_limit_applies() {
        let (conn, report_id) = setup();
        for i in 0..4 {
            insert_query(&conn, &report_id, &format!("q{i}"), "a").unwrap();
        }
        assert_eq!(list_queries(&conn, &report_id, 2).unwrap().len(), 2);
    }

    #[test]
    fn delete_is_scoped_to_report() {
        let (conn, report_id) = setup();
        let record = insert_query(&conn, &report_id, "q", "a").unwrap();

        assert!(!delete_query(&conn, "RPT-other", record.id).unwrap());
        assert!(delete_query(&conn, &report_id, record.id).unwrap());
        assert!(list_queries(&conn, &report_id, 10).unwrap().is_empty());
    }
}
