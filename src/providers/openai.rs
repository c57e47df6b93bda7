use serde_json::{Value, json};

use super::{OutboundRequest, ProviderAdapter, ProviderId, ProviderRequest, Role};
use crate::config::{OpenAiConfig, Secret};
use crate::error::{AgentError, Result};

/// Chat Completions API.
pub struct OpenAiAdapter {
    api_key: Option<Secret>,
    model: String,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(cfg: &OpenAiConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn build_payload(&self, request: &ProviderRequest) -> Value {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        for turn in &request.history {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": turn.text}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.params.max_tokens,
            "temperature": request.params.temperature,
            "top_p": request.params.top_p,
        })
    }

    fn response_fields(&self) -> &'static [&'static str] {
        &["/choices/0/message/content", "/choices/0/text"]
    }

    fn prepare(&self, payload: &Value) -> Result<OutboundRequest> {
        let key = self.api_key.as_ref().ok_or(AgentError::NotConfigured {
            provider: ProviderId::OpenAi,
            missing: "OPENAI_API_KEY",
        })?;
        let url = format!("{}/chat/completions", self.base_url);
        Ok(OutboundRequest::json(ProviderId::OpenAi, url, payload)?
            .with_header("authorization", format!("Bearer {}", key.expose().trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Completion, GenerationParams, Turn};

    fn adapter(key: Option<&str>) -> OpenAiAdapter {
        OpenAiAdapter::new(&OpenAiConfig {
            api_key: key.map(Secret::new),
            model: "gpt-test".to_string(),
            base_url: "https://api.example.test/v1/".to_string(),
        })
    }

    #[test]
    fn test_payload_orders_system_history_prompt() {
        let req = ProviderRequest::new("What is 2+2?", GenerationParams::default())
            .with_system("Be brief.")
            .with_history(Turn::alternating(&["hi".to_string(), "hello!".to_string()]));
        let payload = adapter(Some("k")).build_payload(&req);

        assert_eq!(payload["model"], "gpt-test");
        let roles: Vec<&str> = payload["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(payload["messages"][3]["content"], "What is 2+2?");
        assert_eq!(payload["max_tokens"], 1000);
    }

    #[test]
    fn test_prepare_sets_bearer_and_url() {
        let out = adapter(Some(" sk-abc ")).prepare(&json!({})).unwrap();
        assert_eq!(out.url, "https://api.example.test/v1/chat/completions");
        assert_eq!(out.header("Authorization"), Some("Bearer sk-abc"));
        assert_eq!(out.header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_prepare_without_key_is_not_configured() {
        let err = adapter(None).prepare(&json!({})).unwrap_err();
        assert!(matches!(err, AgentError::NotConfigured { .. }));
    }

    #[test]
    fn test_parse_chat_and_legacy_shapes() {
        let a = adapter(None);
        let chat = json!({"choices": [{"message": {"role": "assistant", "content": "4"}}]});
        let legacy = json!({"choices": [{"text": "four"}]});
        assert_eq!(a.parse_response(&chat), Completion::Text("4".to_string()));
        assert_eq!(a.parse_response(&legacy), Completion::Text("four".to_string()));
        assert_eq!(a.parse_response(&json!({"choices": []})), Completion::NoValidOutput);
    }
}
