//! Shared fakes for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use lead_intake_api::calendar::Scheduler;
use lead_intake_api::config::{Config, LedgerBackend, ScoringConfig};
use lead_intake_api::dedup::DuplicateGuard;
use lead_intake_api::errors::AppError;
use lead_intake_api::handlers::AppState;
use lead_intake_api::intake::LeadIntake;
use lead_intake_api::ledger::LeadLedger;
use lead_intake_api::models::{AppointmentSlot, Lead, LeadStatus, LeadSubmission};
use lead_intake_api::notifications::NotificationChannel;
use lead_intake_api::scoring::IntentScorer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MEET_LINK: &str = "https://meet.google.com/abc-defg-hij";

/// Collaborator calls across fakes, in the order they happened.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Appends to a harness-wide [`CallLog`] once attached.
#[derive(Default)]
pub struct CallRecorder {
    log: Mutex<Option<CallLog>>,
}

impl CallRecorder {
    pub fn attach(&self, log: &CallLog) {
        *self.log.lock().unwrap() = Some(log.clone());
    }

    fn record(&self, step: &'static str) {
        if let Some(log) = self.log.lock().unwrap().as_ref() {
            log.lock().unwrap().push(step);
        }
    }
}

pub fn john_doe() -> LeadSubmission {
    LeadSubmission {
        name: Some("John Doe".to_string()),
        email: Some("john@example.com".to_string()),
        phone: Some("+91-98765-43210".to_string()),
        car_model: Some("Tata Nexon EV".to_string()),
        appointment_datetime: Some("2025-12-15T14:00:00".to_string()),
        notes: None,
    }
}

pub fn test_config() -> Config {
    Config {
        port: 0,
        scoring: ScoringConfig {
            api_key: "test_key".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            model: "test-model".to_string(),
        },
        ledger: LedgerBackend::Postgres {
            database_url: "postgresql://test".to_string(),
        },
        calendar: None,
        timezone: "America/New_York".to_string(),
        appointment_duration_minutes: 60,
        discord_webhook_url: None,
        smtp: None,
        collaborator_timeout_secs: 5,
        dedup_window_secs: 300,
        rate_limit_period_secs: 6,
        rate_limit_burst: 10,
    }
}

// ============ Scorer ============

pub struct FakeScorer {
    result: Result<f64, String>,
    pub calls: AtomicUsize,
    pub recorder: CallRecorder,
}

impl FakeScorer {
    pub fn returning(score: f64) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(score),
            calls: AtomicUsize::new(0),
            recorder: CallRecorder::default(),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            recorder: CallRecorder::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentScorer for FakeScorer {
    async fn score(&self, _lead_text: &str) -> Result<f64, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.record("score");
        self.result
            .clone()
            .map_err(AppError::ExternalApiError)
    }
}

// ============ Ledger ============

/// In-memory ledger keeping rows in insertion order.
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<Lead>>,
    fail_appends: bool,
    fail_link_updates: bool,
    pub appends: AtomicUsize,
    pub recorder: CallRecorder,
}

impl MemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_appends: true,
            ..Self::default()
        })
    }

    /// Accepts appends but errors when a meet link is saved.
    pub fn rejecting_links() -> Arc<Self> {
        Arc::new(Self {
            fail_link_updates: true,
            ..Self::default()
        })
    }

    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<Lead> {
        self.rows.lock().unwrap().clone()
    }

    pub fn seed(&self, lead: Lead) {
        self.rows.lock().unwrap().push(lead);
    }
}

#[async_trait]
impl LeadLedger for MemoryLedger {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, lead: &Lead) -> Result<(), AppError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.recorder.record("ledger");
        if self.fail_appends {
            return Err(AppError::LedgerError("sheet is read-only".to_string()));
        }
        let mut stored = lead.clone();
        stored.errors.clear();
        stored.warnings.clear();
        self.rows.lock().unwrap().push(stored);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        Ok(self.rows())
    }

    async fn update_status(
        &self,
        id: &str,
        status: &LeadStatus,
        notes: Option<&str>,
    ) -> Result<Option<Lead>, AppError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(lead) = rows.iter_mut().find(|lead| lead.id == id) else {
            return Ok(None);
        };
        lead.status = status.clone();
        if let Some(notes) = notes {
            lead.notes = Some(notes.to_string());
        }
        Ok(Some(lead.clone()))
    }

    async fn set_meet_link(&self, id: &str, link: &str) -> Result<bool, AppError> {
        self.recorder.record("save_link");
        if self.fail_link_updates {
            return Err(AppError::LedgerError("range is protected".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(lead) = rows.iter_mut().find(|lead| lead.id == id) else {
            return Ok(false);
        };
        lead.meet_link = Some(link.to_string());
        Ok(true)
    }
}

// ============ Scheduler ============

pub struct FakeScheduler {
    link: Option<String>,
    pub calls: AtomicUsize,
    pub booked: Mutex<Vec<AppointmentSlot>>,
    pub recorder: CallRecorder,
}

impl FakeScheduler {
    pub fn returning(link: &str) -> Arc<Self> {
        Arc::new(Self {
            link: Some(link.to_string()),
            calls: AtomicUsize::new(0),
            booked: Mutex::new(Vec::new()),
            recorder: CallRecorder::default(),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            link: None,
            calls: AtomicUsize::new(0),
            booked: Mutex::new(Vec::new()),
            recorder: CallRecorder::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scheduler for FakeScheduler {
    async fn book(&self, _lead: &Lead, slot: &AppointmentSlot) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.record("book");
        self.booked.lock().unwrap().push(*slot);
        self.link
            .clone()
            .ok_or_else(|| AppError::ExternalApiError("calendar quota exceeded".to_string()))
    }
}

// ============ Notifications ============

pub struct FakeChannel {
    name: &'static str,
    fail: bool,
    pub calls: AtomicUsize,
    pub seen_links: Mutex<Vec<Option<String>>>,
    pub recorder: CallRecorder,
}

impl FakeChannel {
    pub fn ok(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: false,
            calls: AtomicUsize::new(0),
            seen_links: Mutex::new(Vec::new()),
            recorder: CallRecorder::default(),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail: true,
            calls: AtomicUsize::new(0),
            seen_links: Mutex::new(Vec::new()),
            recorder: CallRecorder::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for FakeChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, lead: &Lead) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recorder.record("notify");
        self.seen_links.lock().unwrap().push(lead.meet_link.clone());
        if self.fail {
            return Err(AppError::ExternalApiError("webhook returned 500".to_string()));
        }
        Ok(())
    }
}

// ============ Harness ============

/// One set of fakes wired into an intake pipeline.
pub struct Harness {
    pub scorer: Arc<FakeScorer>,
    pub ledger: Arc<MemoryLedger>,
    pub scheduler: Option<Arc<FakeScheduler>>,
    pub channels: Vec<Arc<FakeChannel>>,
    pub log: CallLog,
}

impl Harness {
    /// Every collaborator healthy, one chat channel.
    pub fn healthy() -> Self {
        Self {
            scorer: FakeScorer::returning(0.8),
            ledger: MemoryLedger::new(),
            scheduler: Some(FakeScheduler::returning(MEET_LINK)),
            channels: vec![FakeChannel::ok("Discord")],
            log: CallLog::default(),
        }
    }

    pub fn intake(&self) -> LeadIntake {
        self.intake_with_window(Duration::from_secs(300))
    }

    pub fn intake_with_window(&self, window: Duration) -> LeadIntake {
        self.scorer.recorder.attach(&self.log);
        self.ledger.recorder.attach(&self.log);
        if let Some(scheduler) = &self.scheduler {
            scheduler.recorder.attach(&self.log);
        }
        for channel in &self.channels {
            channel.recorder.attach(&self.log);
        }

        LeadIntake::new(
            self.scorer.clone(),
            self.ledger.clone(),
            self.scheduler
                .clone()
                .map(|s| s as Arc<dyn Scheduler>),
            self.channels
                .iter()
                .map(|c| c.clone() as Arc<dyn NotificationChannel>)
                .collect(),
            DuplicateGuard::new(window),
        )
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            config: test_config(),
            intake: self.intake(),
        })
    }

    /// Collaborator calls recorded so far, oldest first.
    pub fn call_order(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    /// Total collaborator invocations across every fake.
    pub fn total_calls(&self) -> usize {
        self.scorer.calls()
            + self.ledger.appends()
            + self.scheduler.as_ref().map_or(0, |s| s.calls())
            + self.channels.iter().map(|c| c.calls()).sum::<usize>()
    }
}
