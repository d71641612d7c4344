use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One answered question about a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRecord {
    pub id: i64,
    pub report_id: String,
    pub question: String,
    pub answer: String,
    pub asked_at: NaiveDateTime,
}
