use serde::{Deserialize, Serialize};

use crate::models::enums::TestStatus;
use crate::models::NewTestResult;

/// Fields the LLM pulled out of a report. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedReport {
    pub patient_name: Option<String>,
    pub patient_age: Option<u32>,
    pub patient_gender: Option<String>,
    pub patient_id: Option<String>,
    pub report_date: Option<String>,
    pub report_type: Option<String>,
    pub hospital_name: Option<String>,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub key_findings: Option<String>,
    pub recommendations: Option<String>,
    #[serde(default)]
    pub test_results: Vec<ExtractedTestResult>,
}

impl ExtractedReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn new_test_results(&self) -> Vec<NewTestResult> {
        self.test_results
            .iter()
            .map(ExtractedTestResult::to_new_test_result)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTestResult {
    pub test_name: String,
    pub test_value: Option<String>,
    pub unit: Option<String>,
    pub normal_range: Option<String>,
    pub status: Option<String>,
}

impl ExtractedTestResult {
    pub fn to_new_test_result(&self) -> NewTestResult {
        NewTestResult {
            test_name: self.test_name.clone(),
            test_value: self.test_value.clone(),
            unit: self.unit.clone(),
            normal_range: self.normal_range.clone(),
            status: self
                .status
                .as_deref()
                .map(TestStatus::from_loose)
                .unwrap_or(TestStatus::Unknown),
        }
    }
}
