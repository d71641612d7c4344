use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered patient. The PIN hash never leaves the repository layer
/// except through `PatientCredentials`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct PatientCredentials {
    pub patient: Patient,
    pub pin_hash: String,
}
