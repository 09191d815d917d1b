//! Lead submission validation.
//!
//! Required fields are checked first and reported together; format checks only
//! run once every required field is present.

use crate::errors::AppError;
use crate::models::{AppointmentSlot, LeadSubmission};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

pub const REQUIRED_FIELDS: [&str; 5] = ["name", "email", "phone", "car_model", "appointment_datetime"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static email regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("static phone regex"));

const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A submission that passed validation, with fields trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidLead {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub car_model: String,
    pub appointment: AppointmentSlot,
    pub notes: Option<String>,
}

/// Validates a raw submission.
///
/// Returns `AppError::Validation` carrying every field-level failure.
pub fn validate_submission(submission: &LeadSubmission) -> Result<ValidLead, AppError> {
    // Same order as REQUIRED_FIELDS
    let values = [
        &submission.name,
        &submission.email,
        &submission.phone,
        &submission.car_model,
        &submission.appointment_datetime,
    ];

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .zip(values)
        .filter(|(_, value)| trimmed(value).is_none())
        .map(|(field, _)| format!("Missing required field: {}", field))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Validation(missing));
    }

    // All present from here on
    let name = trimmed(&submission.name).unwrap_or_default();
    let email = trimmed(&submission.email).unwrap_or_default();
    let phone = trimmed(&submission.phone).unwrap_or_default();
    let car_model = trimmed(&submission.car_model).unwrap_or_default();
    let appointment_raw = trimmed(&submission.appointment_datetime).unwrap_or_default();

    let mut errors = Vec::new();
    if !is_valid_email(&email) {
        errors.push("Invalid email format".to_string());
    }
    if !is_valid_phone(&phone) {
        errors.push("Invalid phone format".to_string());
    }
    let appointment = match parse_appointment(&appointment_raw) {
        Some(slot) => Some(slot),
        None => {
            tracing::error!("Invalid datetime format: {}", appointment_raw);
            errors.push("Invalid datetime format (use ISO 8601)".to_string());
            None
        }
    };

    match appointment {
        Some(appointment) if errors.is_empty() => {
            if appointment.is_in_past() {
                tracing::warn!("Appointment time is in the past: {}", appointment_raw);
            }
            Ok(ValidLead {
                name,
                email,
                phone,
                car_model,
                appointment,
                notes: trimmed(&submission.notes),
            })
        }
        _ => Err(AppError::Validation(errors)),
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validate email address against a standard `local@domain.tld` pattern.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Validate phone number after stripping common separators (`-`, space, parentheses).
pub fn is_valid_phone(phone: &str) -> bool {
    let cleaned: String = phone
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | '(' | ')'))
        .collect();
    PHONE_RE.is_match(&cleaned)
}

/// Parse an ISO-8601-like appointment time.
///
/// Accepts RFC 3339, a trailing `Z`, minute precision, a space separator, and a
/// bare date (midnight). Offsets are kept; naive times stay naive.
pub fn parse_appointment(raw: &str) -> Option<AppointmentSlot> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(AppointmentSlot {
            start: dt.naive_local(),
            offset: Some(*dt.offset()),
        });
    }

    // Trailing "Z" means UTC
    let zoned = match raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        Some(stripped) => format!("{}+00:00", stripped),
        None => raw.to_string(),
    };
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, format) {
            return Some(AppointmentSlot {
                start: dt.naive_local(),
                offset: Some(*dt.offset()),
            });
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(start) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(AppointmentSlot {
                start,
                offset: None,
            });
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|start| AppointmentSlot {
            start,
            offset: None,
        })
}
