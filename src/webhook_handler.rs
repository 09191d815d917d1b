use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{LeadResponse, LeadSubmission};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

/// Lead webhook handler
///
/// Receives a lead from the website form, runs it through the intake pipeline
/// and reports every step outcome. The status code reflects whether the lead
/// was captured:
///
/// * 200 - logged to the ledger (side-effect failures appear as warnings)
/// * 400 - validation failure, duplicate submission or malformed JSON
/// * 413 - body larger than the router's limit
/// * 502 - the ledger write failed
#[utoipa::path(
    post,
    path = "/webhook/lead",
    request_body = LeadSubmission,
    responses(
        (status = 200, description = "Lead captured", body = LeadResponse),
        (status = 400, description = "Invalid or duplicate submission", body = LeadResponse),
        (status = 413, description = "Request body too large"),
        (status = 502, description = "Lead could not be logged", body = LeadResponse)
    )
)]
pub async fn receive_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<LeadResponse>), AppError> {
    let Json(submission) = payload.map_err(|e| {
        tracing::warn!("Rejected lead webhook body: {}", e.body_text());
        AppError::from(e)
    })?;

    tracing::info!("Received lead webhook");

    let outcome = state.intake.submit(&submission).await;

    let status = if outcome.rejected {
        StatusCode::BAD_REQUEST
    } else if outcome.response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    if let Some(lead) = &outcome.lead {
        tracing::info!("Lead {} ({}) answered with {}", lead.id, lead.car_model, status);
    }

    Ok((status, Json(outcome.response)))
}
