//! API endpoint handlers, one module per resource.

pub mod assignments;
pub mod chat;
pub mod consents;
pub mod doctors;
pub mod health;
pub mod patients;
pub mod reports;
pub mod summary;

use uuid::Uuid;

use crate::api::error::ApiError;

/// Parse a UUID path segment. Malformed ids cannot name a stored row, so
/// they are reported as not found.
pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(format!("{entity} not found")))
}

/// Parse a UUID carried in a request body.
pub(crate) fn parse_body_id(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("{field} is not a valid id")))
}
