use crate::handlers::{self, AppState};
use crate::webhook_handler;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorError,
    GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request bodies above this size are rejected with 413, either by the body
/// limit layer when `Content-Length` is declared or by the JSON extractor.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Per-IP token bucket applied to the lead webhook.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Seconds to replenish one request.
    pub period_secs: u64,
    pub burst: u32,
}

/// Builds the application router.
///
/// With `rate_limit` set, the webhook route keys clients by IP, so the server
/// must be started with connect info.
pub fn router(state: Arc<AppState>, rate_limit: Option<RateLimit>) -> anyhow::Result<Router> {
    let mut webhook_routes: Router<Arc<AppState>> =
        Router::new().route("/webhook/lead", post(webhook_handler::receive_lead));

    if let Some(limit) = rate_limit {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(limit.period_secs)
                .burst_size(limit.burst)
                .key_extractor(SmartIpKeyExtractor)
                .error_handler(rate_limit_response)
                .finish()
                .ok_or_else(|| {
                    anyhow::anyhow!("Rate limit period and burst must both be non-zero")
                })?,
        );
        webhook_routes = webhook_routes.layer(GovernorLayer {
            config: governor_conf,
        });
    }

    let app = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/dashboard", get(handlers::dashboard))
        .route("/lead/:lead_id", get(handlers::get_lead))
        .route("/lead/:lead_id/status", put(handlers::update_lead_status))
        .route("/docs", get(handlers::serve_swagger_ui))
        .route("/api-docs/openapi.json", get(handlers::serve_openapi_spec))
        .merge(webhook_routes)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        );

    Ok(app)
}

/// Renders governor rejections in the same `{success, error}` shape as the handlers.
fn rate_limit_response(err: GovernorError) -> Response {
    let (status, message, headers) = match err {
        GovernorError::TooManyRequests { wait_time, headers } => (
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too many requests, retry in {}s", wait_time),
            headers,
        ),
        GovernorError::UnableToExtractKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unable to identify client".to_string(),
            None,
        ),
        GovernorError::Other { code, msg, headers } => (
            code,
            msg.unwrap_or_else(|| "Request rejected".to_string()),
            headers,
        ),
    };

    tracing::warn!("Rate limiter rejected request: {}", message);

    let mut response = (status, Json(json!({ "success": false, "error": message }))).into_response();
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response
}
