use crate::errors::{AppError, ResultExt};
use crate::ledger::LeadLedger;
use crate::models::{Lead, LeadStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

const LEAD_COLUMNS: &str = "id, name, email, phone, car_model, appointment_datetime, notes, \
                            intent_score, meet_link, status, created_at";

#[derive(Debug, FromRow)]
struct LeadRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    car_model: String,
    appointment_datetime: String,
    notes: Option<String>,
    intent_score: Option<f64>,
    meet_link: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<LeadRow> for Lead {
    fn from(row: LeadRow) -> Self {
        Lead {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            car_model: row.car_model,
            appointment_datetime: row.appointment_datetime,
            notes: row.notes,
            intent_score: row.intent_score,
            meet_link: row.meet_link,
            status: LeadStatus::from(row.status),
            created_at: row.created_at,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Lead ledger backed by the Postgres `leads` table.
pub struct LeadStorage {
    pool: PgPool,
}

impl LeadStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadLedger for LeadStorage {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn append(&self, lead: &Lead) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO leads (
                id, name, email, phone, car_model, appointment_datetime,
                notes, intent_score, meet_link, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.car_model)
        .bind(&lead.appointment_datetime)
        .bind(&lead.notes)
        .bind(lead.intent_score)
        .bind(&lead.meet_link)
        .bind(lead.status.as_str())
        .bind(lead.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Inserting lead {}", lead.id))?;

        tracing::info!("Stored lead in Postgres: {} (ID: {})", lead.name, lead.id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads ORDER BY seq ASC",
            LEAD_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Listing leads")?;

        Ok(rows.into_iter().map(Lead::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Lead>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "SELECT {} FROM leads WHERE id = $1",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Fetching lead {}", id))?;

        Ok(row.map(Lead::from))
    }

    async fn update_status(
        &self,
        id: &str,
        status: &LeadStatus,
        notes: Option<&str>,
    ) -> Result<Option<Lead>, AppError> {
        // Single-statement update: concurrent writers serialize on the row lock.
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            "UPDATE leads SET status = $2, notes = COALESCE($3, notes) WHERE id = $1 RETURNING {}",
            LEAD_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(notes)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Updating status of lead {}", id))?;

        if row.is_some() {
            tracing::info!("Updated lead {} status to {}", id, status);
        }
        Ok(row.map(Lead::from))
    }

    async fn set_meet_link(&self, id: &str, link: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE leads SET meet_link = $2 WHERE id = $1")
            .bind(id)
            .bind(link)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Saving meet link of lead {}", id))?;

        Ok(result.rows_affected() > 0)
    }
}
