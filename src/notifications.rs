//! Outbound lead notifications.
//!
//! Each channel is attempted independently by the orchestrator; a failing
//! channel only produces a warning on the lead.

use crate::config::SmtpConfig;
use crate::errors::AppError;
use crate::models::Lead;
use async_trait::async_trait;
use chrono::Utc;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{authentication::Credentials, PoolConfig},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Score at or above which a lead is announced as high intent.
pub const HIGH_INTENT_THRESHOLD: f64 = 0.8;

const HIGH_INTENT_COLOR: u32 = 15158332;
const DEFAULT_COLOR: u32 = 5814783;

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Human-readable channel name used in warnings.
    fn name(&self) -> &'static str;

    async fn send(&self, lead: &Lead) -> Result<(), AppError>;
}

pub fn is_high_intent(lead: &Lead) -> bool {
    lead.intent_score.map_or(false, |s| s >= HIGH_INTENT_THRESHOLD)
}

fn score_label(lead: &Lead) -> String {
    lead.intent_score
        .map_or_else(|| "N/A".to_string(), |s| format!("{:.2}", s))
}

// ============ Discord ============

/// Posts an embed to a Discord incoming webhook.
pub struct DiscordChannel {
    client: Client,
    webhook_url: String,
}

impl DiscordChannel {
    pub fn new(webhook_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create Discord client: {}", e))
        })?;

        Ok(Self {
            client,
            webhook_url: webhook_url.to_string(),
        })
    }

    pub fn payload(lead: &Lead) -> Value {
        let high_intent = is_high_intent(lead);
        let field = |name: &str, value: &str, inline: bool| {
            json!({ "name": name, "value": value, "inline": inline })
        };

        let mut fields = vec![
            field("Name", &lead.name, true),
            field("Email", &lead.email, true),
            field("Phone", &lead.phone, true),
            field("Car Model", &lead.car_model, true),
            field("Appointment", &lead.appointment_datetime, true),
            field("Intent Score", &score_label(lead), true),
        ];
        if let Some(link) = &lead.meet_link {
            fields.push(field("Meet Link", link, false));
        }
        if let Some(notes) = &lead.notes {
            fields.push(field("Notes", notes, false));
        }
        fields.push(field("Lead ID", &lead.id, false));

        let content = if high_intent { "@here New lead received!" } else { "" };
        let color = if high_intent { HIGH_INTENT_COLOR } else { DEFAULT_COLOR };
        json!({
            "content": content,
            "embeds": [{
                "title": format!("New Lead: {}", lead.name),
                "color": color,
                "fields": fields,
                "timestamp": Utc::now().to_rfc3339(),
                "footer": { "text": "Lead Intake" }
            }]
        })
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    fn name(&self) -> &'static str {
        "Discord"
    }

    async fn send(&self, lead: &Lead) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::payload(lead))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Discord request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Discord webhook returned {}: {}",
                status, error_text
            )));
        }

        tracing::info!("Discord notification sent for lead {}", lead.id);
        Ok(())
    }
}

// ============ Email ============

/// Sends the appointment confirmation to the lead over SMTP.
#[derive(Clone)]
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_mailbox: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, AppError> {
        let from_mailbox = format!("{} <{}>", config.from_name, config.username)
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid sender address: {}", e)))?;

        // Port 465 is implicit TLS; anything else negotiates STARTTLS.
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| AppError::InternalError(format!("Failed to create SMTP relay: {}", e)))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .pool_config(PoolConfig::new().max_size(4))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from_mailbox,
        })
    }

    pub fn subject(lead: &Lead) -> String {
        format!("Appointment Confirmed - {}", lead.car_model)
    }

    pub fn plain_body(lead: &Lead) -> String {
        let mut body = format!(
            "Hi {},\n\n\
             Thank you for your interest in the {}.\n\n\
             Your consultation is scheduled for {}.\n",
            lead.name, lead.car_model, lead.appointment_datetime
        );
        if let Some(link) = &lead.meet_link {
            body.push_str(&format!("Meeting link: {}\n", link));
        }
        body.push_str(&format!(
            "\nWhat to expect:\n\
             - A walkthrough of the {} features and pricing\n\
             - Financing and trade-in options\n\
             - Time for any questions you have\n\n\
             Reference ID: {}\n\n\
             Best regards,\nThe Dealership Team\n",
            lead.car_model, lead.id
        ));
        body
    }

    pub fn html_body(lead: &Lead) -> String {
        let meet = lead.meet_link.as_deref().map_or_else(String::new, |link| {
            format!(
                "<p><strong>Meeting link:</strong> <a href=\"{0}\">{0}</a></p>",
                escape_html(link)
            )
        });
        format!(
            "<html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
             <h2>Your appointment is confirmed</h2>\
             <p>Hi {name},</p>\
             <p>Thank you for your interest in the <strong>{model}</strong>.</p>\
             <p><strong>When:</strong> {when}</p>\
             {meet}\
             <h3>What to expect</h3>\
             <ul>\
             <li>A walkthrough of the {model} features and pricing</li>\
             <li>Financing and trade-in options</li>\
             <li>Time for any questions you have</li>\
             </ul>\
             <p style=\"color: #888;\">Reference ID: {id}</p>\
             <p>Best regards,<br>The Dealership Team</p>\
             </body></html>",
            name = escape_html(&lead.name),
            model = escape_html(&lead.car_model),
            when = escape_html(&lead.appointment_datetime),
            meet = meet,
            id = escape_html(&lead.id),
        )
    }

    fn build_message(&self, lead: &Lead) -> Result<Message, AppError> {
        let to_mailbox = format!("{} <{}>", lead.name, lead.email)
            .parse::<Mailbox>()
            .or_else(|_| lead.email.parse::<Mailbox>())
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient email: {}", e)))?;

        Message::builder()
            .from(self.from_mailbox.clone())
            .to(to_mailbox)
            .subject(Self::subject(lead))
            .multipart(MultiPart::alternative_plain_html(
                Self::plain_body(lead),
                Self::html_body(lead),
            ))
            .map_err(|e| AppError::InternalError(format!("Failed to build email message: {}", e)))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, lead: &Lead) -> Result<(), AppError> {
        let message = self.build_message(lead)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalApiError(format!("SMTP send failed: {}", e)))?;

        tracing::info!("Confirmation email sent to {}", lead.email);
        Ok(())
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
