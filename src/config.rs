use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub scoring: ScoringConfig,
    pub ledger: LedgerBackend,
    /// `None` disables calendar booking; every lead then carries a warning.
    pub calendar: Option<CalendarConfig>,
    pub timezone: String,
    pub appointment_duration_minutes: i64,
    pub discord_webhook_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub collaborator_timeout_secs: u64,
    pub dedup_window_secs: u64,
    pub rate_limit_period_secs: u64,
    pub rate_limit_burst: u32,
}

/// OpenAI-compatible chat-completions endpoint used for intent scoring.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub enum LedgerBackend {
    Sheets(SheetsConfig),
    Postgres { database_url: String },
}

impl LedgerBackend {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerBackend::Sheets(_) => "sheets",
            LedgerBackend::Postgres { .. } => "postgres",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    /// Service-account key JSON.
    pub credentials_json: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub calendar_id: String,
    /// Service-account key JSON.
    pub credentials_json: String,
    pub create_meet: bool,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let ledger = match env_or("LEDGER_BACKEND", "sheets").to_lowercase().as_str() {
            "sheets" => LedgerBackend::Sheets(SheetsConfig {
                spreadsheet_id: required("SPREADSHEET_ID")?,
                sheet_name: env_or("SHEET_NAME", "Leads"),
                credentials_json: load_credentials(
                    "GOOGLE_SHEETS_CREDS",
                    "./credentials/sheets_creds.json",
                )?
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "GOOGLE_SHEETS_CREDS (or _BASE64 / _FILE) required for the sheets ledger"
                    )
                })?,
                base_url: DEFAULT_SHEETS_BASE_URL.to_string(),
            }),
            "postgres" => LedgerBackend::Postgres {
                database_url: std::env::var("DATABASE_URL")
                    .or_else(|_| std::env::var("DB_URL"))
                    .map_err(|_| {
                        anyhow::anyhow!("DATABASE_URL or DB_URL required for the postgres ledger")
                    })
                    .and_then(|url| {
                        if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                            anyhow::bail!(
                                "DATABASE_URL must start with postgresql:// or postgres://"
                            );
                        }
                        Ok(url)
                    })?,
            },
            other => anyhow::bail!("LEDGER_BACKEND must be 'sheets' or 'postgres', got '{}'", other),
        };

        let calendar = load_credentials(
            "GOOGLE_CALENDAR_CREDS",
            "./credentials/calendar_creds.json",
        )?
        .map(|credentials_json| -> anyhow::Result<CalendarConfig> {
            Ok(CalendarConfig {
                calendar_id: env_or("CALENDAR_ID", "primary"),
                credentials_json,
                create_meet: parse_or("CALENDAR_CREATE_MEET", false)?,
                base_url: DEFAULT_CALENDAR_BASE_URL.to_string(),
            })
        })
        .transpose()?;

        let smtp = match (optional("GMAIL_USER"), optional("GMAIL_APP_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpConfig {
                host: env_or("SMTP_HOST", "smtp.gmail.com"),
                port: parse_or("SMTP_PORT", 587)?,
                username,
                password,
                from_name: env_or("SMTP_FROM_NAME", "Dealership Team"),
            }),
            _ => None,
        };

        let discord_webhook_url = optional("DISCORD_WEBHOOK_URL")
            .map(|url| http_url("DISCORD_WEBHOOK_URL", url))
            .transpose()?;

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            scoring: ScoringConfig {
                api_key: required("GROQ_API_KEY")?,
                base_url: http_url("GROQ_BASE_URL", env_or("GROQ_BASE_URL", DEFAULT_GROQ_BASE_URL))?,
                model: env_or("GROQ_MODEL", DEFAULT_GROQ_MODEL),
            },
            ledger,
            calendar,
            timezone: env_or("TIMEZONE", "America/New_York"),
            appointment_duration_minutes: parse_or("APPOINTMENT_DURATION_MINUTES", 60)?,
            discord_webhook_url,
            smtp,
            collaborator_timeout_secs: parse_or("COLLABORATOR_TIMEOUT_SECS", 10)?,
            dedup_window_secs: parse_or("DEDUP_WINDOW_SECS", 300)?,
            rate_limit_period_secs: parse_or("RATE_LIMIT_PERIOD_SECS", 6)?,
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", 10)?,
        };

        if config.appointment_duration_minutes <= 0 {
            anyhow::bail!("APPOINTMENT_DURATION_MINUTES must be positive");
        }

        // Never log credential values
        tracing::debug!("Ledger backend: {}", config.ledger.name());
        tracing::debug!("Scoring endpoint: {} ({})", config.scoring.base_url, config.scoring.model);
        if config.calendar.is_none() {
            tracing::warn!("Google Calendar credentials not configured - booking disabled");
        }
        if config.smtp.is_none() {
            tracing::warn!("Gmail credentials not configured - email notifications disabled");
        }
        if config.discord_webhook_url.is_none() {
            tracing::warn!("Discord webhook not configured - Discord notifications disabled");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", name))
        .and_then(|value| {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            Ok(value)
        })
}

fn env_or(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match optional(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", name, raw)),
        None => Ok(default),
    }
}

fn http_url(name: &str, value: String) -> anyhow::Result<String> {
    let parsed = url::Url::parse(&value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(value.trim_end_matches('/').to_string())
}

/// Resolves service-account JSON from `<VAR>_BASE64`, then `<VAR>`, then the
/// file named by `<VAR>_FILE` (or `default_file`). Returns `None` when none is set.
pub fn load_credentials(env_var: &str, default_file: &str) -> anyhow::Result<Option<String>> {
    if let Some(encoded) = optional(&format!("{}_BASE64", env_var)) {
        tracing::info!("Loading {} from base64 environment variable", env_var);
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| anyhow::anyhow!("{}_BASE64 is not valid base64: {}", env_var, e))?;
        let decoded = String::from_utf8(bytes)
            .map_err(|e| anyhow::anyhow!("{}_BASE64 is not UTF-8: {}", env_var, e))?;
        return normalize_credentials(env_var, &decoded).map(Some);
    }

    if let Some(raw) = optional(env_var) {
        tracing::info!("Loading {} from environment variable", env_var);
        return normalize_credentials(env_var, &raw).map(Some);
    }

    let file_var = format!("{}_FILE", env_var);
    let path = env_or(&file_var, default_file);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            tracing::info!("Loading credentials from file: {}", path);
            normalize_credentials(env_var, &content).map(Some)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No credentials found for {}", env_var);
            Ok(None)
        }
        Err(e) => Err(anyhow::anyhow!("Error reading {}: {}", path, e)),
    }
}

/// Strips a UTF-8 BOM and checks the payload is JSON.
pub fn normalize_credentials(label: &str, raw: &str) -> anyhow::Result<String> {
    let content = raw.trim_start_matches('\u{feff}').trim();
    serde_json::from_str::<serde_json::Value>(content)
        .map_err(|e| anyhow::anyhow!("Invalid JSON for {}: {}", label, e))?;
    Ok(content.to_string())
}
