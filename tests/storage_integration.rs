use chrono::Utc;
use std::env;
use uuid::Uuid;

use lead_intake_api::db::Database;
use lead_intake_api::db_storage::LeadStorage;
use lead_intake_api::ledger::LeadLedger;
use lead_intake_api::models::{Lead, LeadStatus};

/// Round trip through the Postgres ledger backend.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn postgres_ledger_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = LeadStorage::new(db.pool.clone());

    let lead = Lead {
        id: Uuid::new_v4().to_string(),
        name: "Test Lead".to_string(),
        email: "test.lead@example.com".to_string(),
        phone: "+91-98765-43210".to_string(),
        car_model: "Tata Nexon EV".to_string(),
        appointment_datetime: "2025-12-15T14:00:00".to_string(),
        notes: None,
        intent_score: Some(0.65),
        meet_link: None,
        status: LeadStatus::New,
        created_at: Utc::now(),
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    storage
        .append(&lead)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let fetched = storage
        .get(&lead.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("lead not found after insert"))?;
    assert_eq!(fetched.email, lead.email);
    assert_eq!(fetched.status, LeadStatus::New);

    let updated = storage
        .update_status(&lead.id, &LeadStatus::Contacted, Some("Left voicemail"))
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("lead not found on update"))?;
    assert_eq!(updated.status, LeadStatus::Contacted);
    assert_eq!(updated.notes.as_deref(), Some("Left voicemail"));

    let linked = storage
        .set_meet_link(&lead.id, "https://meet.google.com/abc-defg-hij")
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(linked);
    let fetched = storage
        .get(&lead.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .ok_or_else(|| anyhow::anyhow!("lead not found after link update"))?;
    assert_eq!(
        fetched.meet_link.as_deref(),
        Some("https://meet.google.com/abc-defg-hij")
    );

    let missing = storage
        .update_status(&Uuid::new_v4().to_string(), &LeadStatus::Closed, None)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(missing.is_none());

    let all = storage
        .list()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(all.iter().any(|l| l.id == lead.id));

    // Cleanup
    sqlx::query("DELETE FROM leads WHERE id = $1")
        .bind(&lead.id)
        .execute(&db.pool)
        .await?;

    Ok(())
}
