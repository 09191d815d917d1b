//! Durable lead ledger.
//!
//! The orchestrator appends one row per captured lead; the dashboard reads and
//! updates through the same store. Two backends exist: a Google Sheets
//! spreadsheet (`sheets_ledger`) and a Postgres table (`db_storage`).

use crate::errors::AppError;
use crate::models::{Lead, LeadStatus};
use async_trait::async_trait;

#[async_trait]
pub trait LeadLedger: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Appends `lead` as a new row.
    async fn append(&self, lead: &Lead) -> Result<(), AppError>;

    /// All leads in row (insertion) order.
    async fn list(&self) -> Result<Vec<Lead>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<Lead>, AppError> {
        Ok(self.list().await?.into_iter().find(|lead| lead.id == id))
    }

    /// Sets the status (and notes, when given) of an existing lead.
    ///
    /// Returns `None` without writing anything when `id` is unknown.
    async fn update_status(
        &self,
        id: &str,
        status: &LeadStatus,
        notes: Option<&str>,
    ) -> Result<Option<Lead>, AppError>;

    /// Records the booked meeting link on an existing lead.
    ///
    /// Returns `false` without writing anything when `id` is unknown.
    async fn set_meet_link(&self, id: &str, link: &str) -> Result<bool, AppError>;
}
