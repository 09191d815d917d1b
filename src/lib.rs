//! Lead Intake API Library
//!
//! Webhook receiver for car-dealership leads. A submission is validated,
//! scored for purchase intent, logged to a ledger (Google Sheets or Postgres),
//! booked on Google Calendar and announced over Discord and email. A small
//! dashboard API reads and updates logged leads.
//!
//! # Modules
//!
//! - `calendar`: Google Calendar scheduler.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Postgres ledger backend.
//! - `dedup`: Duplicate submission guard.
//! - `errors`: Error handling types.
//! - `google_auth`: Service-account OAuth tokens.
//! - `handlers`: Dashboard, health and docs handlers.
//! - `intake`: Lead orchestration.
//! - `ledger`: Ledger trait.
//! - `models`: Core data models.
//! - `notifications`: Discord and email channels.
//! - `routes`: Router assembly.
//! - `scoring`: Intent scoring client.
//! - `sheets_ledger`: Google Sheets ledger backend.
//! - `validation`: Submission validation.
//! - `webhook_handler`: Lead webhook handler.

pub mod calendar;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod dedup;
pub mod errors;
pub mod google_auth;
pub mod handlers;
pub mod intake;
pub mod ledger;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod scoring;
pub mod sheets_ledger;
pub mod validation;
pub mod webhook_handler;
