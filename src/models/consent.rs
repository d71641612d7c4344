use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ConsentStatus;

/// A patient's grant of access to a doctor for a date window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub permissions: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ConsentStatus,
    pub created_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
}

impl Consent {
    /// Active means not revoked and `today` inside the inclusive window.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.status == ConsentStatus::Active && self.start_date <= today && today <= self.end_date
    }
}
