use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_datetime, now_timestamp, parse_datetime};
use crate::db::DatabaseError;
use crate::models::enums::{Gender, ReportStatus};
use crate::models::{Report, ReportAiUpdate};

/// Default page size for report listings.
pub const DEFAULT_REPORT_LIMIT: u32 = 100;

// `raw_text` is only selected for single-report reads.
const LIST_COLUMNS: &str = "id, owner_patient_id, file_name, patient_name, patient_age, patient_gender,
     patient_ref, report_date, report_type, hospital_name, doctor_name, summary, diagnosis,
     key_findings, recommendations, NULL, status, uploaded_at, updated_at";

const DETAIL_COLUMNS: &str = "id, owner_patient_id, file_name, patient_name, patient_age, patient_gender,
     patient_ref, report_date, report_type, hospital_name, doctor_name, summary, diagnosis,
     key_findings, recommendations, raw_text, status, uploaded_at, updated_at";

pub fn insert_report(conn: &Connection, report: &Report) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO reports (id, owner_patient_id, file_name, patient_name, patient_age,
            patient_gender, patient_ref, report_date, report_type, hospital_name, doctor_name,
            summary, diagnosis, key_findings, recommendations, raw_text, status, uploaded_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        params![
            report.id,
            report.owner_patient_id.map(|id| id.to_string()),
            report.file_name,
            report.patient_name,
            report.patient_age,
            report.patient_gender.as_str(),
            report.patient_ref,
            report.report_date,
            report.report_type,
            report.hospital_name,
            report.doctor_name,
            report.summary,
            report.diagnosis,
            report.key_findings,
            report.recommendations,
            report.raw_text,
            report.status.as_str(),
            format_datetime(&report.uploaded_at),
            format_datetime(&report.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_report(conn: &Connection, id: &str) -> Result<Option<Report>, DatabaseError> {
    let sql = format!("SELECT {DETAIL_COLUMNS} FROM reports WHERE id = ?1");
    conn.query_row(&sql, params![id], ReportRow::read)
        .optional()?
        .map(report_from_row)
        .transpose()
}

/// Newest first.
pub fn list_reports(conn: &Connection, limit: u32) -> Result<Vec<Report>, DatabaseError> {
    let sql = format!(
        "SELECT {LIST_COLUMNS} FROM reports ORDER BY uploaded_at DESC, id DESC LIMIT ?1"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit], ReportRow::read)?;
    rows.map(|r| report_from_row(r?)).collect()
}

pub fn list_reports_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Report>, DatabaseError> {
    let sql = format!(
        "SELECT {LIST_COLUMNS} FROM reports WHERE owner_patient_id = ?1
         ORDER BY uploaded_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id.to_string()], ReportRow::read)?;
    rows.map(|r| report_from_row(r?)).collect()
}

/// Case-insensitive substring match over patient name, diagnosis and summary.
pub fn search_reports(
    conn: &Connection,
    query: &str,
    limit: u32,
) -> Result<Vec<Report>, DatabaseError> {
    let pattern = format!("%{}%", escape_like(query.trim()));
    let sql = format!(
        "SELECT {LIST_COLUMNS} FROM reports
         WHERE patient_name LIKE ?1 ESCAPE '\\'
            OR diagnosis LIKE ?1 ESCAPE '\\'
            OR summary LIKE ?1 ESCAPE '\\'
         ORDER BY uploaded_at DESC, id DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![pattern, limit], ReportRow::read)?;
    rows.map(|r| report_from_row(r?)).collect()
}

pub fn update_report_status(
    conn: &Connection,
    id: &str,
    status: ReportStatus,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE reports SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), format_datetime(&now_timestamp()), id],
    )?;
    Ok(changed > 0)
}

/// Apply the present fields of `update`. Returns false when the report is unknown.
pub fn update_report_ai_data(
    conn: &Connection,
    id: &str,
    update: &ReportAiUpdate,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE reports SET
            summary = COALESCE(?1, summary),
            diagnosis = COALESCE(?2, diagnosis),
            key_findings = COALESCE(?3, key_findings),
            recommendations = COALESCE(?4, recommendations),
            report_type = COALESCE(?5, report_type),
            updated_at = ?6
         WHERE id = ?7",
        params![
            update.summary,
            update.diagnosis,
            update.key_findings,
            update.recommendations,
            update.report_type,
            format_datetime(&now_timestamp()),
            id,
        ],
    )?;
    Ok(changed > 0)
}

/// Delete a report. Test results, query history and index chunks go with it.
pub fn delete_report(conn: &Connection, id: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute("DELETE FROM reports WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Internal row type for Report mapping
struct ReportRow {
    id: String,
    owner_patient_id: Option<String>,
    file_name: String,
    patient_name: Option<String>,
    patient_age: Option<u32>,
    patient_gender: String,
    patient_ref: Option<String>,
    report_date: Option<String>,
    report_type: String,
    hospital_name: Option<String>,
    doctor_name: Option<String>,
    summary: Option<String>,
    diagnosis: Option<String>,
    key_findings: Option<String>,
    recommendations: Option<String>,
    raw_text: Option<String>,
    status: String,
    uploaded_at: String,
    updated_at: String,
}

impl ReportRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_patient_id: row.get(1)?,
            file_name: row.get(2)?,
            patient_name: row.get(3)?,
            patient_age: row.get(4)?,
            patient_gender: row.get(5)?,
            patient_ref: row.get(6)?,
            report_date: row.get(7)?,
            report_type: row.get(8)?,
            hospital_name: row.get(9)?,
            doctor_name: row.get(10)?,
            summary: row.get(11)?,
            diagnosis: row.get(12)?,
            key_findings: row.get(13)?,
            recommendations: row.get(14)?,
            raw_text: row.get(15)?,
            status: row.get(16)?,
            uploaded_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }
}

fn report_from_row(row: ReportRow) -> Result<Report, DatabaseError> {
    Ok(Report {
        id: row.id,
        owner_patient_id: row.owner_patient_id.and_then(|s| Uuid::parse_str(&s).ok()),
        file_name: row.file_name,
        patient_name: row.patient_name,
        patient_age: row.patient_age,
        patient_gender: Gender::from_str(&row.patient_gender).unwrap_or(Gender::Unknown),
        patient_ref: row.patient_ref,
        report_date: row.report_date,
        report_type: row.report_type,
        hospital_name: row.hospital_name,
        doctor_name: row.doctor_name,
        summary: row.summary,
        diagnosis: row.diagnosis,
        key_findings: row.key_findings,
        recommendations: row.recommendations,
        raw_text: row.raw_text,
        status: ReportStatus::from_str(&row.status)?,
        uploaded_at: parse_datetime(&row.uploaded_at),
        updated_at: parse_datetime(&row.updated_at),
    })
}
