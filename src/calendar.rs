use crate::config::CalendarConfig;
use crate::errors::AppError;
use crate::google_auth::{AccessTokenSource, CALENDAR_SCOPE};
use crate::models::{AppointmentSlot, Lead};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Books a consultation slot and returns the meeting link.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn book(&self, lead: &Lead, slot: &AppointmentSlot) -> Result<String, AppError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    html_link: Option<String>,
    #[serde(default)]
    hangout_link: Option<String>,
}

/// Google Calendar v3 client inserting one event per lead.
pub struct CalendarClient {
    client: Client,
    base_url: String,
    calendar_id: String,
    create_meet: bool,
    timezone: String,
    duration_minutes: i64,
    auth: Arc<dyn AccessTokenSource>,
}

impl CalendarClient {
    pub fn new(
        config: &CalendarConfig,
        timezone: &str,
        duration_minutes: i64,
        auth: Arc<dyn AccessTokenSource>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create Calendar client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            create_meet: config.create_meet,
            timezone: timezone.to_string(),
            duration_minutes,
            auth,
        })
    }

    /// Event resource for `lead` starting at `slot`.
    pub fn event_body(&self, lead: &Lead, slot: &AppointmentSlot) -> Value {
        let score = lead
            .intent_score
            .map_or_else(|| "not scored".to_string(), |s| format!("{:.2}", s));
        let mut description = format!(
            "Lead consultation with {}\n\nEmail: {}\nPhone: {}\nIntent Score: {}\nLead ID: {}",
            lead.name, lead.email, lead.phone, score, lead.id
        );
        if let Some(notes) = &lead.notes {
            description.push_str(&format!("\nNotes: {}", notes));
        }
        description.push_str(&format!(
            "\n\nPlease review lead details before the meeting.\nSend calendar invite manually to: {}",
            lead.email
        ));

        let mut event = json!({
            "summary": format!("Car Consultation - {}", lead.car_model),
            "description": description,
            "start": { "dateTime": slot.to_iso(), "timeZone": self.timezone },
            "end": {
                "dateTime": slot.plus_minutes(self.duration_minutes).to_iso(),
                "timeZone": self.timezone
            },
            "reminders": {
                "useDefault": false,
                "overrides": [
                    { "method": "popup", "minutes": 30 },
                    { "method": "popup", "minutes": 60 }
                ]
            }
        });

        if self.create_meet {
            event["conferenceData"] = json!({
                "createRequest": {
                    "requestId": lead.id,
                    "conferenceSolutionKey": { "type": "hangoutsMeet" }
                }
            });
        }
        event
    }

    fn events_url(&self) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::ExternalApiError(format!("Invalid Calendar base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::ExternalApiError("Calendar base URL cannot be a base".to_string())
            })?
            .pop_if_empty()
            .push("calendars")
            .push(&self.calendar_id)
            .push("events");
        if self.create_meet {
            url.query_pairs_mut().append_pair("conferenceDataVersion", "1");
        }
        Ok(url)
    }
}

#[async_trait]
impl Scheduler for CalendarClient {
    async fn book(&self, lead: &Lead, slot: &AppointmentSlot) -> Result<String, AppError> {
        let token = self.auth.access_token(CALENDAR_SCOPE).await?;
        let url = self.events_url()?;

        tracing::info!("Attempting to create calendar event for {}", lead.name);
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&self.event_body(lead, slot))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Calendar request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Calendar API returned {}: {}",
                status, error_text
            )));
        }

        let event: CreatedEvent = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse Calendar response: {}", e))
        })?;

        let link = event
            .hangout_link
            .or(event.html_link)
            .filter(|link| !link.is_empty())
            .ok_or_else(|| {
                AppError::ExternalApiError("Calendar event created without a link".to_string())
            })?;

        tracing::info!(
            "Calendar event created successfully: {} ({})",
            event.id.as_deref().unwrap_or("unknown id"),
            link
        );
        Ok(link)
    }
}
