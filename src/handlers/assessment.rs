use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::{AppState, json_body, traced};
use crate::error::Result;
use crate::models::{AgentResponse, AssessmentRequest, AssessmentResponse, PromptRequest};

pub async fn ai_agent(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<AgentResponse>> {
    traced("/ai-agent/", async move {
        let req = json_body(payload)?;
        state.dispatcher.handle_prompt(&req).await
    })
    .await
}

pub async fn generate_assessment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AssessmentRequest>, JsonRejection>,
) -> Result<Json<AssessmentResponse>> {
    traced("/generate-assessment", async move {
        let req = json_body(payload)?;
        state.dispatcher.generate_assessment(&req).await
    })
    .await
}

pub async fn catalog(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<String>>> {
    Json(state.dispatcher.pre_built_catalog().clone())
}
