use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub license_id: String,
    pub full_name: String,
    pub specialization: String,
    pub verified: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct DoctorCredentials {
    pub doctor: Doctor,
    pub password_hash: String,
}
