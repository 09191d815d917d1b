use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::intake::LeadIntake;
use crate::models::*;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use utoipa::OpenApi;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Collaborator pipeline; also owns the ledger used by the dashboard.
    pub intake: LeadIntake,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Lead Intake API", description = "Car dealership lead webhook and dashboard"),
    paths(
        crate::webhook_handler::receive_lead,
        health,
        dashboard,
        get_lead,
        update_lead_status
    ),
    components(schemas(
        LeadSubmission,
        StatusUpdateRequest,
        Lead,
        LeadResponse,
        DashboardResponse,
        LeadEnvelope
    ))
)]
pub struct ApiDoc;

/// Health check endpoint.
///
/// Reports which collaborators are wired without calling any of them.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let intake = &state.intake;
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
            "components": {
                "scoring": state.config.scoring.model,
                "ledger": intake.ledger().backend(),
                "calendar": intake.has_scheduler(),
                "notifications": intake.channel_names(),
            }
        })),
    )
}

/// GET /dashboard
///
/// Lists every lead in ledger order.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "All logged leads", body = DashboardResponse),
        (status = 502, description = "Ledger unavailable")
    )
)]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardResponse>, AppError> {
    tracing::info!("GET /dashboard");

    let leads = state
        .intake
        .ledger()
        .list()
        .await
        .context("Listing leads for dashboard")?;

    Ok(Json(DashboardResponse {
        success: true,
        count: leads.len(),
        leads,
    }))
}

/// GET /lead/:lead_id
#[utoipa::path(
    get,
    path = "/lead/{lead_id}",
    params(("lead_id" = String, Path, description = "Lead identifier")),
    responses(
        (status = 200, description = "The lead", body = LeadEnvelope),
        (status = 404, description = "Unknown lead id")
    )
)]
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
) -> Result<Json<LeadEnvelope>, AppError> {
    tracing::info!("GET /lead/{}", lead_id);

    let lead = state
        .intake
        .ledger()
        .get(&lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

    Ok(Json(LeadEnvelope {
        success: true,
        lead,
    }))
}

/// PUT /lead/:lead_id/status
///
/// Sets the lead's status and, when given, its notes. Unknown ids are never
/// created.
#[utoipa::path(
    put,
    path = "/lead/{lead_id}/status",
    params(("lead_id" = String, Path, description = "Lead identifier")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Updated lead", body = LeadEnvelope),
        (status = 400, description = "Missing status"),
        (status = 404, description = "Unknown lead id")
    )
)]
pub async fn update_lead_status(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<LeadEnvelope>, AppError> {
    let Json(request) = payload.map_err(AppError::from)?;

    let status = request.status.trim();
    if status.is_empty() {
        return Err(AppError::BadRequest("Status is required".to_string()));
    }
    let notes = request.notes.as_deref().map(str::trim);

    tracing::info!("PUT /lead/{}/status -> {}", lead_id, status);

    let lead = state
        .intake
        .ledger()
        .update_status(&lead_id, &LeadStatus::from(status), notes)
        .await?
        .ok_or_else(|| AppError::NotFound("Lead not found".to_string()))?;

    Ok(Json(LeadEnvelope {
        success: true,
        lead,
    }))
}

pub async fn index() -> &'static str {
    "Lead Intake API is running"
}

/// Unmatched routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Endpoint not found".to_string())
}

pub async fn serve_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Serves the Swagger UI HTML page.
///
/// The page loads the document served by `serve_openapi_spec`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Lead Intake API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}
