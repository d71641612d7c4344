//! Registration input rules for patients and doctors.
//!
//! The first failing rule wins; its message is returned to the client as-is.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z\s]+$").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{10}$").unwrap());
static PIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());

const PASSWORD_SPECIALS: &[char] = &['@', '$', '!', '%', '*', '?', '&'];

/// Raw patient registration body. Every field is optional so that a missing
/// field produces a readable message rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRegistration {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub pin: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRegistration {
    pub license_id: Option<String>,
    pub full_name: Option<String>,
    pub specialization: Option<String>,
    pub password: Option<String>,
}

/// Patient fields after validation and normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPatient {
    pub first_name: String,
    pub last_name: String,
    /// Lower-cased.
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidDoctor {
    pub license_id: String,
    pub full_name: String,
    pub specialization: String,
    pub password: String,
}

pub fn validate_patient_registration(
    input: &PatientRegistration,
    today: NaiveDate,
) -> Result<ValidPatient, ValidationError> {
    let first_name = required(&input.first_name, "firstName")?;
    let last_name = required(&input.last_name, "lastName")?;
    let email = required(&input.email, "email")?;
    let phone = required(&input.phone, "phone")?;
    let date_of_birth = required(&input.date_of_birth, "dateOfBirth")?;
    let pin = required(&input.pin, "pin")?;

    if !is_valid_name(first_name) {
        return Err(ValidationError::new(
            "First name must be at least 2 characters and contain only letters",
        ));
    }
    if !is_valid_name(last_name) {
        return Err(ValidationError::new(
            "Last name must be at least 2 characters and contain only letters",
        ));
    }
    if !is_valid_email(email) {
        return Err(ValidationError::new("Invalid email address"));
    }
    if !PHONE_RE.is_match(phone) {
        return Err(ValidationError::new("Phone number must be exactly 10 digits"));
    }
    if !is_valid_pin(pin) {
        return Err(ValidationError::new("PIN must be exactly 6 digits"));
    }
    let date_of_birth = NaiveDate::parse_from_str(date_of_birth, "%Y-%m-%d")
        .map_err(|_| ValidationError::new("Date of birth must be in YYYY-MM-DD format"))?;
    if date_of_birth > today {
        return Err(ValidationError::new("Date of birth cannot be in the future"));
    }

    Ok(ValidPatient {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_lowercase(),
        phone: phone.to_string(),
        date_of_birth,
        pin: pin.to_string(),
    })
}

pub fn validate_doctor_registration(
    input: &DoctorRegistration,
) -> Result<ValidDoctor, ValidationError> {
    let license_id = required(&input.license_id, "licenseId")?;
    let full_name = required(&input.full_name, "fullName")?;
    let specialization = required(&input.specialization, "specialization")?;
    // Passwords are not trimmed.
    let password = input
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ValidationError::new("password is required"))?;

    if license_id.chars().count() < 5 {
        return Err(ValidationError::new("License ID must be at least 5 characters"));
    }
    if full_name.chars().count() < 3 {
        return Err(ValidationError::new("Full name must be at least 3 characters"));
    }
    validate_password(password)?;

    Ok(ValidDoctor {
        license_id: license_id.to_string(),
        full_name: full_name.to_string(),
        specialization: specialization.to_string(),
        password: password.to_string(),
    })
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        return Err(ValidationError::new("Password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            "Password must contain at least 1 uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::new(
            "Password must contain at least 1 lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("Password must contain at least 1 number"));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(&c)) {
        return Err(ValidationError::new(
            "Password must contain at least 1 special character (@$!%*?&)",
        ));
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_pin(pin: &str) -> bool {
    PIN_RE.is_match(pin)
}

fn is_valid_name(name: &str) -> bool {
    name.chars().count() >= 2 && NAME_RE.is_match(name)
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::new(format!("{field} is required")))
}
