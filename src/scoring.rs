use crate::config::ScoringConfig;
use crate::errors::AppError;
use crate::validation::ValidLead;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a lead qualification assistant. Return only valid JSON.";

/// Estimates purchase intent from lead text.
#[async_trait]
pub trait IntentScorer: Send + Sync {
    /// Returns a score in [0, 1].
    async fn score(&self, lead_text: &str) -> Result<f64, AppError>;
}

/// Builds the scoring prompt for a validated lead.
pub fn scoring_prompt(lead: &ValidLead) -> String {
    let mut prompt = format!(
        "Analyze this car dealership lead and return a strict JSON object with intent scoring.\n\n\
         Lead Information:\n\
         - Name: {}\n\
         - Email: {}\n\
         - Phone: {}\n\
         - Car Model: {}\n\
         - Appointment: {}\n",
        lead.name,
        lead.email,
        lead.phone,
        lead.car_model,
        lead.appointment.to_iso()
    );
    if let Some(notes) = &lead.notes {
        prompt.push_str(&format!("- Customer Notes: {}\n", notes));
    }
    prompt.push_str(
        "\nCalculate an intent_score (0.0 to 1.0) based on:\n\
         - Email domain quality (corporate vs free email) - corporate emails get +0.2\n\
         - Car model (luxury vs economy) - luxury models get +0.3\n\
         - Appointment timing (urgency) - appointments within 3 days get +0.2\n\
         - Base score is 0.5\n\n\
         Return ONLY valid JSON in this exact format: {\"intent_score\": 0.75}",
    );
    prompt
}

/// Clamps a model score into [0, 1]; non-finite values are rejected.
pub fn clamp_score(raw: f64) -> Option<f64> {
    raw.is_finite().then(|| raw.clamp(0.0, 1.0))
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Extracts `intent_score` from the model's JSON reply.
///
/// Accepts the score as a number or a numeric string.
pub fn parse_score_content(content: &str) -> Result<f64, AppError> {
    let parsed: Value = serde_json::from_str(content.trim()).map_err(|e| {
        AppError::ExternalApiError(format!("Scoring reply is not JSON: {}", e))
    })?;

    let raw = match parsed.get("intent_score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        AppError::ExternalApiError("Scoring reply has no numeric intent_score".to_string())
    })?;

    clamp_score(raw).ok_or_else(|| {
        AppError::ExternalApiError(format!("Scoring reply has invalid intent_score {}", raw))
    })
}

/// Chat-completions client for an OpenAI-compatible endpoint (Groq by default).
#[derive(Clone)]
pub struct GroqScorer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GroqScorer {
    pub fn new(config: &ScoringConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create scoring client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl IntentScorer for GroqScorer {
    async fn score(&self, lead_text: &str) -> Result<f64, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": lead_text }
            ],
            "temperature": 0.3,
            "response_format": { "type": "json_object" }
        });

        tracing::debug!("Requesting intent score from {} ({})", url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Scoring request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Scoring API returned {}: {}",
                status, error_text
            )));
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse scoring response: {}", e))
        })?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::ExternalApiError("Scoring response has no message content".to_string())
            })?;

        let score = parse_score_content(&content)?;
        tracing::info!("Intent score calculated: {:.2}", score);
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_variants() {
        assert_eq!(parse_score_content(r#"{"intent_score": 0.75}"#).unwrap(), 0.75);
        assert_eq!(parse_score_content(r#"{"intent_score": "0.4"}"#).unwrap(), 0.4);
        assert_eq!(parse_score_content(r#"{"intent_score": 1.7}"#).unwrap(), 1.0);
        assert_eq!(parse_score_content(r#"{"intent_score": -3}"#).unwrap(), 0.0);
        assert!(parse_score_content(r#"{"score": 0.5}"#).is_err());
        assert!(parse_score_content("intent_score: 0.5").is_err());
    }

    #[test]
    fn test_clamp_rejects_non_finite() {
        assert_eq!(clamp_score(f64::NAN), None);
        assert_eq!(clamp_score(f64::INFINITY), None);
        assert_eq!(clamp_score(0.3), Some(0.3));
    }
}
