use lead_intake_api::calendar::{CalendarClient, Scheduler};
use lead_intake_api::config::{Config, LedgerBackend};
use lead_intake_api::db::Database;
use lead_intake_api::db_storage::LeadStorage;
use lead_intake_api::dedup::DuplicateGuard;
use lead_intake_api::google_auth::ServiceAccountAuth;
use lead_intake_api::handlers::AppState;
use lead_intake_api::intake::LeadIntake;
use lead_intake_api::ledger::LeadLedger;
use lead_intake_api::notifications::{DiscordChannel, EmailChannel, NotificationChannel};
use lead_intake_api::routes::{self, RateLimit};
use lead_intake_api::scoring::GroqScorer;
use lead_intake_api::sheets_ledger::SheetsLedger;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing and configuration, wires the ledger backend and the
/// optional collaborators, then serves the router.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let timeout = Duration::from_secs(config.collaborator_timeout_secs);

    let ledger: Arc<dyn LeadLedger> = match &config.ledger {
        LedgerBackend::Sheets(sheets) => {
            let auth = Arc::new(ServiceAccountAuth::from_json(
                &sheets.credentials_json,
                timeout,
            )?);
            let ledger = SheetsLedger::new(sheets, auth, timeout)?;
            // A missing header only degrades the sheet's readability.
            if let Err(e) = ledger.ensure_header().await {
                tracing::warn!("Could not verify sheet headers: {}", e);
            }
            tracing::info!("✓ Google Sheets ledger ready: {}", sheets.spreadsheet_id);
            Arc::new(ledger)
        }
        LedgerBackend::Postgres { database_url } => {
            let db = Database::new(database_url).await?;
            tracing::info!("✓ Postgres ledger ready");
            Arc::new(LeadStorage::new(db.pool))
        }
    };

    let scorer = Arc::new(GroqScorer::new(&config.scoring, timeout)?);

    let scheduler: Option<Arc<dyn Scheduler>> = match &config.calendar {
        Some(calendar) => {
            let auth = Arc::new(ServiceAccountAuth::from_json(
                &calendar.credentials_json,
                timeout,
            )?);
            let client = CalendarClient::new(
                calendar,
                &config.timezone,
                config.appointment_duration_minutes,
                auth,
                timeout,
            )?;
            tracing::info!("✓ Google Calendar ready: {}", calendar.calendar_id);
            Some(Arc::new(client))
        }
        None => None,
    };

    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
    if let Some(url) = &config.discord_webhook_url {
        channels.push(Arc::new(DiscordChannel::new(url, timeout)?));
        tracing::info!("✓ Discord notifications enabled");
    }
    if let Some(smtp) = &config.smtp {
        channels.push(Arc::new(EmailChannel::new(smtp, timeout)?));
        tracing::info!("✓ Email notifications enabled via {}", smtp.host);
    }

    let intake = LeadIntake::new(
        scorer,
        ledger,
        scheduler,
        channels,
        DuplicateGuard::new(Duration::from_secs(config.dedup_window_secs)),
    );

    let rate_limit = RateLimit {
        period_secs: config.rate_limit_period_secs,
        burst: config.rate_limit_burst,
    };
    let port = config.port;
    let app_state = Arc::new(AppState { config, intake });
    let app = routes::router(app_state, Some(rate_limit))?;

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
