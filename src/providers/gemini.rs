use serde_json::{Value, json};

use super::{OutboundRequest, ProviderAdapter, ProviderId, ProviderRequest, Role};
use crate::config::{GeminiConfig, Secret};
use crate::error::{AgentError, Result};

/// Generative Language API `generateContent`. The key travels in the
/// `x-goog-api-key` header so it never shows up in a logged URL.
pub struct GeminiAdapter {
    api_key: Option<Secret>,
    model: String,
    base_url: String,
}

impl GeminiAdapter {
    pub fn new(cfg: &GeminiConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn build_payload(&self, request: &ProviderRequest) -> Value {
        let mut contents: Vec<Value> = request
            .history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({"role": role, "parts": [{"text": turn.text}]})
            })
            .collect();
        contents.push(json!({"role": "user", "parts": [{"text": request.prompt}]}));

        let mut payload = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": request.params.max_tokens,
                "temperature": request.params.temperature,
                "topP": request.params.top_p,
            },
        });
        if let Some(system) = &request.system {
            payload["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        payload
    }

    fn response_fields(&self) -> &'static [&'static str] {
        &["/candidates/0/content/parts/0/text"]
    }

    fn prepare(&self, payload: &Value) -> Result<OutboundRequest> {
        let key = self.api_key.as_ref().ok_or(AgentError::NotConfigured {
            provider: ProviderId::Gemini,
            missing: "GOOGLE_API_KEY",
        })?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        Ok(OutboundRequest::json(ProviderId::Gemini, url, payload)?
            .with_header("x-goog-api-key", key.expose().trim()))
    }
}
