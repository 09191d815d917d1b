//! Posts a sample lead to a running instance and prints the response.

use chrono::{Duration, Local};
use dotenvy::dotenv;
use serde_json::json;
use std::env;

/// Main entry point for the test-lead utility.
///
/// Targets `LEAD_API_URL` (default `http://127.0.0.1:5000`) with an
/// appointment three days from now at 14:00 local time.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let base_url = env::var("LEAD_API_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string());

    let appointment = (Local::now() + Duration::days(3))
        .date_naive()
        .and_hms_opt(14, 0, 0)
        .ok_or("invalid appointment time")?;

    let lead = json!({
        "name": "John Doe",
        "email": "john.doe@example.com",
        "phone": "+91-98765-43210",
        "car_model": "Tata Nexon EV",
        "appointment_datetime": appointment.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "notes": "Interested in a test drive and financing options"
    });

    let url = format!("{}/webhook/lead", base_url.trim_end_matches('/'));
    println!("Sending test lead to {}", url);
    println!("{}", serde_json::to_string_pretty(&lead)?);

    let response = reqwest::Client::new().post(&url).json(&lead).send().await?;
    let status = response.status();
    let body: serde_json::Value = response.json().await?;

    println!("\nStatus: {}", status);
    println!("{}", serde_json::to_string_pretty(&body)?);

    if let Some(lead_id) = body.get("lead_id").and_then(|v| v.as_str()) {
        println!("\nView it at {}/lead/{}", base_url.trim_end_matches('/'), lead_id);
    }

    Ok(())
}
