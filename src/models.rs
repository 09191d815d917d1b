use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

// ============ Inbound Payloads ============

/// Raw lead submission as posted to `/webhook/lead`.
///
/// Every field is optional at the wire level so that missing fields are
/// reported together by the validator instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct LeadSubmission {
    #[schema(example = "John Doe")]
    pub name: Option<String>,
    #[schema(example = "john@example.com")]
    pub email: Option<String>,
    #[schema(example = "+91-98765-43210")]
    pub phone: Option<String>,
    #[schema(example = "Tata Nexon EV")]
    pub car_model: Option<String>,
    /// ISO-8601 date-time, with or without offset.
    #[schema(example = "2025-12-15T14:00:00")]
    pub appointment_datetime: Option<String>,
    /// Free-text remarks from the customer.
    pub notes: Option<String>,
}

/// Body of `PUT /lead/{lead_id}/status`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    #[schema(example = "contacted")]
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

// ============ Domain Models ============

/// Lifecycle state of a lead. Unknown values are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LeadStatus {
    New,
    Contacted,
    Booked,
    Closed,
    Other(String),
}

impl LeadStatus {
    pub fn as_str(&self) -> &str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Booked => "booked",
            LeadStatus::Closed => "closed",
            LeadStatus::Other(s) => s,
        }
    }
}

impl From<String> for LeadStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "new" => LeadStatus::New,
            "contacted" => LeadStatus::Contacted,
            "booked" => LeadStatus::Booked,
            "closed" => LeadStatus::Closed,
            _ => LeadStatus::Other(raw.trim().to_string()),
        }
    }
}

impl From<&str> for LeadStatus {
    fn from(raw: &str) -> Self {
        LeadStatus::from(raw.to_string())
    }
}

impl From<LeadStatus> for String {
    fn from(status: LeadStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound customer inquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    /// Opaque identifier assigned at creation.
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub car_model: String,
    /// Normalized ISO-8601 appointment time.
    pub appointment_datetime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Purchase-intent estimate in [0, 1].
    pub intent_score: Option<f64>,
    pub meet_link: Option<String>,
    #[schema(value_type = String, example = "new")]
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
    /// Step failures for the submission that created this lead (not persisted).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Non-fatal step issues for the submission that created this lead (not persisted).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Requested appointment start, keeping the caller's offset when one was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppointmentSlot {
    pub start: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl AppointmentSlot {
    /// Slot shifted forward by `minutes`, same offset.
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self {
            start: self.start + Duration::minutes(minutes),
            offset: self.offset,
        }
    }

    /// `YYYY-MM-DDTHH:MM:SS`, suffixed with `±HH:MM` when zoned.
    pub fn to_iso(&self) -> String {
        let local = self.start.format("%Y-%m-%dT%H:%M:%S").to_string();
        match self.offset {
            Some(offset) => format!("{}{}", local, offset),
            None => local,
        }
    }

    pub fn is_in_past(&self) -> bool {
        match self.offset {
            Some(offset) => {
                let utc = self.start - Duration::seconds(offset.local_minus_utc() as i64);
                utc < Utc::now().naive_utc() - Duration::minutes(5)
            }
            None => self.start < chrono::Local::now().naive_local() - Duration::minutes(5),
        }
    }
}

// ============ Response Models ============

/// Outcome of a webhook submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeadResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LeadResponse {
    /// Rejected before any collaborator ran.
    pub fn rejected(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub success: bool,
    pub count: usize,
    pub leads: Vec<Lead>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeadEnvelope {
    pub success: bool,
    pub lead: Lead,
}
