use crate::config::SheetsConfig;
use crate::errors::{AppError, ResultExt};
use crate::google_auth::{AccessTokenSource, SHEETS_SCOPE};
use crate::ledger::LeadLedger;
use crate::models::{Lead, LeadStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const HEADER: [&str; 11] = [
    "Lead ID",
    "Timestamp",
    "Name",
    "Email",
    "Phone",
    "Car Model",
    "Appointment",
    "Intent Score",
    "Meet Link",
    "Status",
    "Notes",
];

const MEET_LINK_COLUMN: char = 'I';
const STATUS_COLUMN: char = 'J';
const NOTES_COLUMN: char = 'K';

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Lead ledger stored in a Google Sheets tab, one row per lead.
pub struct SheetsLedger {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    auth: Arc<dyn AccessTokenSource>,
    // Serializes read-modify-write status updates.
    write_lock: Mutex<()>,
}

impl SheetsLedger {
    pub fn new(
        config: &SheetsConfig,
        auth: Arc<dyn AccessTokenSource>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalApiError(format!("Failed to create Sheets client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            auth,
            write_lock: Mutex::new(()),
        })
    }

    /// A1 range on the configured tab, quoting names that need it.
    fn range(&self, cells: &str) -> String {
        if self.sheet_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            format!("{}!{}", self.sheet_name, cells)
        } else {
            format!("'{}'!{}", self.sheet_name.replace('\'', "''"), cells)
        }
    }

    fn values_url(&self, range_suffix: &str, query: &[(&str, &str)]) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AppError::LedgerError(format!("Invalid Sheets base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::LedgerError("Sheets base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .push("values")
            .push(range_suffix);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn call(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value, AppError> {
        let token = self.auth.access_token(SHEETS_SCOPE).await?;
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::LedgerError(format!("Sheets request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::LedgerError(format!(
                "Sheets API returned {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::LedgerError(format!("Failed to parse Sheets response: {}", e)))
    }

    async fn read_rows(&self, cells: &str) -> Result<Vec<Vec<Value>>, AppError> {
        let url = self.values_url(
            &self.range(cells),
            &[("valueRenderOption", "UNFORMATTED_VALUE")],
        )?;
        let body = self.call(Method::GET, url, None).await?;
        let range: ValueRange = serde_json::from_value(body)
            .map_err(|e| AppError::LedgerError(format!("Unexpected Sheets payload: {}", e)))?;
        Ok(range.values)
    }

    /// Writes the header row when the tab is empty.
    pub async fn ensure_header(&self) -> Result<(), AppError> {
        let existing = self.read_rows("A1:K1").await?;
        if existing.first().map_or(false, |row| !row.is_empty()) {
            return Ok(());
        }

        self.write_cells("A1:K1", json!(HEADER)).await?;
        tracing::info!("Created headers in sheet '{}'", self.sheet_name);
        Ok(())
    }

    /// Overwrites `cells` with a single row of values.
    async fn write_cells(&self, cells: &str, row: Value) -> Result<Value, AppError> {
        let range = self.range(cells);
        let url = self.values_url(&range, &[("valueInputOption", "RAW")])?;
        self.call(
            Method::PUT,
            url,
            Some(json!({ "range": range, "majorDimension": "ROWS", "values": [row] })),
        )
        .await
    }

    async fn row_number(&self, id: &str) -> Result<Option<usize>, AppError> {
        Ok(self
            .numbered_leads()
            .await?
            .into_iter()
            .find_map(|(row_number, lead)| (lead.id == id).then_some(row_number)))
    }

    /// Data rows paired with their 1-based sheet row number.
    async fn numbered_leads(&self) -> Result<Vec<(usize, Lead)>, AppError> {
        let rows = self.read_rows("A2:K").await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| row_to_lead(row).map(|lead| (idx + 2, lead)))
            .collect())
    }
}

/// Row layout, see [`HEADER`].
pub fn lead_to_row(lead: &Lead) -> Vec<Value> {
    vec![
        json!(lead.id),
        json!(lead.created_at.to_rfc3339()),
        json!(lead.name),
        json!(lead.email),
        json!(lead.phone),
        json!(lead.car_model),
        json!(lead.appointment_datetime),
        lead.intent_score.map_or(json!(""), |score| json!(score)),
        json!(lead.meet_link.clone().unwrap_or_default()),
        json!(lead.status.as_str()),
        json!(lead.notes.clone().unwrap_or_default()),
    ]
}

fn cell(row: &[Value], idx: usize) -> Option<String> {
    let text = match row.get(idx)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Parses a sheet row; rows without a lead id are skipped.
pub fn row_to_lead(row: &[Value]) -> Option<Lead> {
    let id = cell(row, 0)?;
    let created_at = cell(row, 1)
        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_default();

    Some(Lead {
        id,
        created_at,
        name: cell(row, 2).unwrap_or_default(),
        email: cell(row, 3).unwrap_or_default(),
        phone: cell(row, 4).unwrap_or_default(),
        car_model: cell(row, 5).unwrap_or_default(),
        appointment_datetime: cell(row, 6).unwrap_or_default(),
        intent_score: cell(row, 7).and_then(|s| s.parse::<f64>().ok()),
        meet_link: cell(row, 8),
        status: cell(row, 9).map(LeadStatus::from).unwrap_or(LeadStatus::New),
        notes: cell(row, 10),
        errors: Vec::new(),
        warnings: Vec::new(),
    })
}

#[async_trait]
impl LeadLedger for SheetsLedger {
    fn backend(&self) -> &'static str {
        "sheets"
    }

    async fn append(&self, lead: &Lead) -> Result<(), AppError> {
        let url = self.values_url(
            &format!("{}:append", self.range("A:K")),
            &[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")],
        )?;

        self.call(
            Method::POST,
            url,
            Some(json!({ "majorDimension": "ROWS", "values": [lead_to_row(lead)] })),
        )
        .await
        .with_context(|| format!("Appending lead {}", lead.id))?;

        tracing::info!("Logged lead to Google Sheets: {} (ID: {})", lead.name, lead.id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        Ok(self
            .numbered_leads()
            .await?
            .into_iter()
            .map(|(_, lead)| lead)
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: &LeadStatus,
        notes: Option<&str>,
    ) -> Result<Option<Lead>, AppError> {
        let _guard = self.write_lock.lock().await;

        let Some((row_number, mut lead)) = self
            .numbered_leads()
            .await?
            .into_iter()
            .find(|(_, lead)| lead.id == id)
        else {
            return Ok(None);
        };

        lead.status = status.clone();
        if let Some(notes) = notes {
            lead.notes = Some(notes.to_string());
        }

        self.write_cells(
            &format!("{}{}:{}{}", STATUS_COLUMN, row_number, NOTES_COLUMN, row_number),
            json!([lead.status.as_str(), lead.notes.clone().unwrap_or_default()]),
        )
        .await
        .with_context(|| format!("Updating status of lead {}", id))?;

        tracing::info!("Updated lead {} status to {}", id, lead.status);
        Ok(Some(lead))
    }

    async fn set_meet_link(&self, id: &str, link: &str) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;

        let Some(row_number) = self.row_number(id).await? else {
            return Ok(false);
        };

        self.write_cells(
            &format!("{}{}:{}{}", MEET_LINK_COLUMN, row_number, MEET_LINK_COLUMN, row_number),
            json!([link]),
        )
        .await
        .with_context(|| format!("Saving meet link of lead {}", id))?;

        tracing::info!("Saved meet link for lead {}", id);
        Ok(true)
    }
}
