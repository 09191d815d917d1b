//! Lead intake orchestration.
//!
//! A submission is validated, checked against the duplicate guard, then handed
//! to the scorer, ledger, scheduler and notification channels in that order.
//! Every collaborator runs exactly once; its failure becomes a message on the
//! response instead of aborting the request. Only a ledger failure makes the
//! submission unsuccessful.

use crate::calendar::Scheduler;
use crate::dedup::DuplicateGuard;
use crate::errors::AppError;
use crate::ledger::LeadLedger;
use crate::models::{Lead, LeadResponse, LeadStatus, LeadSubmission};
use crate::notifications::NotificationChannel;
use crate::scoring::{clamp_score, scoring_prompt, IntentScorer};
use crate::validation::{validate_submission, ValidLead};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub const DUPLICATE_LEAD_ERROR: &str = "Duplicate lead - already processed";
pub const CALENDAR_NOT_CONFIGURED: &str = "Calendar booking not configured";
pub const NO_NOTIFICATION_CHANNELS: &str = "No notification channels configured";

/// How a failed step affects the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Lead was not durably captured.
    Error,
    /// Lead was captured; a side effect is missing.
    Warning,
}

/// Messages collected while a lead moves through the pipeline.
#[derive(Debug, Default)]
struct StepReport {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl StepReport {
    fn record(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Error => {
                tracing::error!("{}", message);
                self.errors.push(message);
            }
            Severity::Warning => {
                tracing::warn!("{}", message);
                self.warnings.push(message);
            }
        }
    }

    /// Folds a step outcome into the report, returning the value on success.
    fn step<T>(
        &mut self,
        outcome: Result<T, AppError>,
        severity: Severity,
        describe: impl FnOnce(&AppError) -> String,
    ) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(severity, describe(&e));
                None
            }
        }
    }
}

/// Result of one webhook submission.
#[derive(Debug)]
pub struct IntakeOutcome {
    pub response: LeadResponse,
    /// The lead as assembled in-process, when validation passed.
    pub lead: Option<Lead>,
    /// The submission was rejected before any collaborator ran.
    pub rejected: bool,
}

/// Runs submissions through the collaborator pipeline.
pub struct LeadIntake {
    scorer: Arc<dyn IntentScorer>,
    ledger: Arc<dyn LeadLedger>,
    scheduler: Option<Arc<dyn Scheduler>>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    guard: DuplicateGuard,
}

impl LeadIntake {
    pub fn new(
        scorer: Arc<dyn IntentScorer>,
        ledger: Arc<dyn LeadLedger>,
        scheduler: Option<Arc<dyn Scheduler>>,
        channels: Vec<Arc<dyn NotificationChannel>>,
        guard: DuplicateGuard,
    ) -> Self {
        Self {
            scorer,
            ledger,
            scheduler,
            channels,
            guard,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LeadLedger> {
        &self.ledger
    }

    pub fn has_scheduler(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn submit(&self, submission: &LeadSubmission) -> IntakeOutcome {
        let valid = match validate_submission(submission) {
            Ok(valid) => valid,
            Err(AppError::Validation(errors)) => {
                tracing::warn!("Validation failed: {:?}", errors);
                return rejected(errors);
            }
            Err(e) => return rejected(vec![e.to_string()]),
        };

        let lead_id = Uuid::new_v4().to_string();
        let fingerprint = DuplicateGuard::fingerprint(&valid.email, &valid.phone);
        if let Err(existing) = self.guard.claim(&fingerprint, &lead_id).await {
            tracing::warn!(
                "Duplicate submission for {} (already captured as {})",
                valid.email,
                existing
            );
            return rejected(vec![DUPLICATE_LEAD_ERROR.to_string()]);
        }

        tracing::info!("Processing new lead {} for {}", lead_id, valid.name);
        let mut lead = new_lead(lead_id, &valid);
        let mut report = StepReport::default();

        // 1. Intent score
        let scored = self
            .scorer
            .score(&scoring_prompt(&valid))
            .await
            .and_then(|raw| {
                clamp_score(raw).ok_or_else(|| {
                    AppError::ExternalApiError(format!("Scorer returned invalid score {}", raw))
                })
            });
        lead.intent_score = report.step(scored, Severity::Warning, |e| {
            format!("Intent scoring failed: {}", e)
        });

        // 2. Ledger
        let logged = self.ledger.append(&lead).await;
        let captured = report
            .step(logged, Severity::Error, |e| {
                format!("Failed to log lead to ledger: {}", e)
            })
            .is_some();
        if !captured {
            self.guard.release(&fingerprint).await;
        }

        // 3. Calendar
        match &self.scheduler {
            Some(scheduler) => {
                let booked = scheduler.book(&lead, &valid.appointment).await;
                lead.meet_link = report.step(booked, Severity::Warning, |e| {
                    format!("Failed to create calendar event: {}", e)
                });
                // The row was appended before booking; backfill its link.
                if let Some(link) = lead.meet_link.as_deref().filter(|_| captured) {
                    let saved = match self.ledger.set_meet_link(&lead.id, link).await {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(AppError::LedgerError(format!(
                            "lead {} missing from ledger",
                            lead.id
                        ))),
                        Err(e) => Err(e),
                    };
                    report.step(saved, Severity::Warning, |e| {
                        format!("Failed to save meet link to ledger: {}", e)
                    });
                }
            }
            None => report.record(Severity::Warning, CALENDAR_NOT_CONFIGURED.to_string()),
        }

        // 4. Notifications
        if self.channels.is_empty() {
            report.record(Severity::Warning, NO_NOTIFICATION_CHANNELS.to_string());
        }
        for channel in &self.channels {
            let sent = channel.send(&lead).await;
            report.step(sent, Severity::Warning, |e| {
                format!("Failed to send {} notification: {}", channel.name(), e)
            });
        }

        lead.errors = report.errors;
        lead.warnings = report.warnings;

        tracing::info!(
            "Lead {} processed: captured={}, {} error(s), {} warning(s)",
            lead.id,
            captured,
            lead.errors.len(),
            lead.warnings.len()
        );

        IntakeOutcome {
            response: LeadResponse {
                success: captured,
                lead_id: Some(lead.id.clone()),
                intent_score: lead.intent_score,
                meet_link: lead.meet_link.clone(),
                errors: lead.errors.clone(),
                warnings: lead.warnings.clone(),
            },
            lead: Some(lead),
            rejected: false,
        }
    }
}

fn rejected(errors: Vec<String>) -> IntakeOutcome {
    IntakeOutcome {
        response: LeadResponse::rejected(errors),
        lead: None,
        rejected: true,
    }
}

fn new_lead(id: String, valid: &ValidLead) -> Lead {
    Lead {
        id,
        name: valid.name.clone(),
        email: valid.email.clone(),
        phone: valid.phone.clone(),
        car_model: valid.car_model.clone(),
        appointment_datetime: valid.appointment.to_iso(),
        notes: valid.notes.clone(),
        intent_score: None,
        meet_link: None,
        status: LeadStatus::New,
        created_at: Utc::now(),
        errors: Vec::new(),
        warnings: Vec::new(),
    }
}
