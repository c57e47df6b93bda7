//! HTTP surface: routes, JSON extraction and error-to-status mapping.

pub mod assessment;
pub mod chat;

#[cfg(test)]
mod test_handlers;

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{AgentError, Result};
use crate::models::ErrorBody;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/ai-agent/", post(assessment::ai_agent))
        .route("/ai-agent", post(assessment::ai_agent))
        .route("/generate-assessment", post(assessment::generate_assessment))
        .route("/assessments", get(assessment::catalog))
        .route("/chat", post(chat::chat))
        .route("/feedback/generate", post(chat::generate_feedback))
        .route("/evaluate-answer", post(chat::evaluate_answer))
        .route("/health", get(|| async { "ok" }))
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Unwraps a JSON body; malformed or missing JSON is a validation error.
pub(crate) fn json_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AgentError::validation(rejection.body_text()))
}

/// Runs a handler body inside a span carrying a fresh request id.
pub(crate) async fn traced<T, F>(route: &'static str, work: F) -> Result<Json<T>>
where
    F: Future<Output = Result<T>>,
{
    let span = tracing::info_span!("request", id = %Uuid::new_v4(), route);
    work.instrument(span).await.map(Json)
}

impl AgentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgentError::Validation(_) => StatusCode::BAD_REQUEST,
            AgentError::ProviderUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AgentError::NotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AgentError::ProviderError { .. }
            | AgentError::EmptyResponse { .. }
            | AgentError::Config(_)
            | AgentError::Internal(_)
            | AgentError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() && self.provider().is_none() {
            // Provider failures are already logged by the registry.
            tracing::error!(error = %self, "Request failed");
        } else if status == StatusCode::BAD_REQUEST {
            tracing::debug!(error = %self, "Rejected request");
        }
        let body = ErrorBody {
            detail: self.public_detail(),
        };
        (status, Json(body)).into_response()
    }
}
