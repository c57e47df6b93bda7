use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use super::{AppState, json_body, traced};
use crate::error::Result;
use crate::models::{
    ChatRequest, ChatResponse, EvaluateRequest, EvaluationResponse, FeedbackRequest,
    FeedbackResponse,
};

pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    traced("/chat", async move {
        let req = json_body(payload)?;
        state.dispatcher.chat(&req).await
    })
    .await
}

pub async fn generate_feedback(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackResponse>> {
    traced("/feedback/generate", async move {
        let req = json_body(payload)?;
        state.dispatcher.generate_feedback(&req).await
    })
    .await
}

pub async fn evaluate_answer(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluationResponse>> {
    traced("/evaluate-answer", async move {
        let req = json_body(payload)?;
        state.dispatcher.evaluate_answer(&req)
    })
    .await
}
