use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Gender, ReportStatus, TestStatus};

pub const DEFAULT_REPORT_TYPE: &str = "Medical Report";

/// A medical report, either uploaded as a PDF and processed, or created
/// empty by a patient and filled in later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: String,
    /// Registered patient this report belongs to, if linked.
    pub owner_patient_id: Option<Uuid>,
    pub file_name: String,
    pub patient_name: Option<String>,
    pub patient_age: Option<u32>,
    pub patient_gender: Gender,
    /// Patient identifier printed on the report itself (hospital MRN etc).
    #[serde(rename = "patient_id")]
    pub patient_ref: Option<String>,
    pub report_date: Option<String>,
    pub report_type: String,
    pub hospital_name: Option<String>,
    pub doctor_name: Option<String>,
    pub summary: Option<String>,
    pub diagnosis: Option<String>,
    pub key_findings: Option<String>,
    pub recommendations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub status: ReportStatus,
    pub uploaded_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Report {
    /// Empty pending report with a fresh id.
    pub fn new(file_name: &str, now: NaiveDateTime) -> Self {
        Self {
            id: generate_report_id(now),
            owner_patient_id: None,
            file_name: file_name.to_string(),
            patient_name: None,
            patient_age: None,
            patient_gender: Gender::Unknown,
            patient_ref: None,
            report_date: None,
            report_type: DEFAULT_REPORT_TYPE.to_string(),
            hospital_name: None,
            doctor_name: None,
            summary: None,
            diagnosis: None,
            key_findings: None,
            recommendations: None,
            raw_text: None,
            status: ReportStatus::Pending,
            uploaded_at: now,
            updated_at: now,
        }
    }
}

/// Report ids look like `RPT-20260118093012-1A2B3C4D`.
pub fn generate_report_id(now: NaiveDateTime) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("RPT-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub id: i64,
    pub report_id: String,
    pub test_name: String,
    pub test_value: Option<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub status: TestStatus,
}

/// Test result row before it has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTestResult {
    pub test_name: String,
    pub test_value: Option<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub status: TestStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: Report,
    pub test_results: Vec<TestResult>,
}

/// Partial update of the AI-derived fields; `None` leaves a column as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAiUpdate {
    pub summary: Option<String>,
    pub diagnosis: Option<String>,
    pub key_findings: Option<String>,
    pub recommendations: Option<String>,
    pub report_type: Option<String>,
}

impl ReportAiUpdate {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.diagnosis.is_none()
            && self.key_findings.is_none()
            && self.recommendations.is_none()
            && self.report_type.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_id_format() {
        let now = chrono::NaiveDate::from_ymd_opt(2026, 1, 18)
            .unwrap()
            .and_hms_opt(9, 30, 12)
            .unwrap();
        let id = generate_report_id(now);
        assert!(id.starts_with("RPT-20260118093012-"), "got {id}");
        let suffix = id.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn report_ids_are_unique() {
        let now = chrono::Local::now().naive_local();
        assert_ne!(generate_report_id(now), generate_report_id(now));
    }

    #[test]
    fn new_report_defaults() {
        let report = Report::new("scan.pdf", chrono::Local::now().naive_local());
        assert_eq!(report.patient_gender, Gender::Unknown);
        assert_eq!(report.report_type, DEFAULT_REPORT_TYPE);
        assert_eq!(report.status, ReportStatus::Pending);
    }

    #[test]
    fn raw_text_omitted_when_absent() {
        let report = Report::new("scan.pdf", chrono::Local::now().naive_local());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("raw_text").is_none());
        assert!(json.get("patient_id").is_some());
    }
}
