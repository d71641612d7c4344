//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`, one sub-module per table.
//! All public functions are re-exported here.

mod assignment;
mod chunk;
mod consent;
mod doctor;
mod patient;
mod query_history;
mod report;
mod test_result;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::DatabaseError;

pub use assignment::*;
pub use chunk::*;
pub use consent::*;
pub use doctor::*;
pub use patient::*;
pub use query_history::*;
pub use report::*;
pub use test_result::*;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_datetime(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .unwrap_or_default()
}

pub(crate) fn format_date(value: &NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad date {value}: {e}")))
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

/// Current local time truncated to whole seconds, as stored in the database.
pub fn now_timestamp() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    parse_datetime(&format_datetime(&now))
}
