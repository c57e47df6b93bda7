//! Provider adapters: one per upstream model API, all behind [`ProviderAdapter`].
//!
//! An adapter knows three things about its provider: how to shape the
//! request payload, where and how to send it, and which response fields
//! carry the generated text. The [`ProviderRegistry`] owns the adapters and
//! the shared [`Transport`], and is the only place an outbound call is made.

pub mod bedrock;
pub mod gemini;
pub mod openai;
pub mod sigv4;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProvidersConfig;
use crate::error::{AgentError, Result};
use crate::transport::Transport;

pub use bedrock::{BedrockAdapter, BedrockFamily};
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;

/// Text returned to callers when a provider body carries no recognizable output.
pub const NO_VALID_OUTPUT: &str = "No valid output returned by the model.";

const LOG_PROMPT_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "bedrock-mistral")]
    BedrockMistral,
    #[serde(rename = "bedrock-llama")]
    BedrockLlama,
    #[serde(rename = "bedrock-claude")]
    BedrockClaude,
}

impl ProviderId {
    pub const ALL: [ProviderId; 5] = [
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::BedrockMistral,
        ProviderId::BedrockLlama,
        ProviderId::BedrockClaude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::BedrockMistral => "bedrock-mistral",
            ProviderId::BedrockLlama => "bedrock-llama",
            ProviderId::BedrockClaude => "bedrock-claude",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Gemini => "Gemini",
            ProviderId::BedrockMistral => "Bedrock Mistral",
            ProviderId::BedrockLlama => "Bedrock Llama",
            ProviderId::BedrockClaude => "Bedrock Claude",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ProviderId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| AgentError::Config(format!("unknown provider '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    /// Prior conversation arrives as plain strings, oldest first, alternating
    /// user and assistant starting with the user.
    pub fn alternating(history: &[String]) -> Vec<Turn> {
        history
            .iter()
            .enumerate()
            .map(|(i, text)| Turn {
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                text: text.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.6,
            top_p: 0.9,
        }
    }
}

/// Provider-neutral request: what to ask, not how to say it on the wire.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub system: Option<String>,
    pub history: Vec<Turn>,
    pub prompt: String,
    pub params: GenerationParams,
}

impl ProviderRequest {
    pub fn new(prompt: impl Into<String>, params: GenerationParams) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            prompt: prompt.into(),
            params,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

/// Parsed provider output. Parsing never fails; an unrecognized body is
/// `NoValidOutput`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Text(String),
    NoValidOutput,
}

impl Completion {
    pub fn into_text(self) -> String {
        match self {
            Completion::Text(text) => text,
            Completion::NoValidOutput => NO_VALID_OUTPUT.to_string(),
        }
    }
}

/// A fully prepared HTTP call: URL, headers (auth included) and the exact
/// body bytes that were signed.
#[derive(Clone)]
pub struct OutboundRequest {
    pub provider: ProviderId,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    pub fn json(provider: ProviderId, url: impl Into<String>, payload: &Value) -> Result<Self> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| AgentError::Internal(format!("failed to encode {provider} payload: {e}")))?;
        Ok(Self {
            provider,
            url: url.into(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    pub fn payload(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

// Header values can hold credentials, so only names are printed.
impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("OutboundRequest")
            .field("provider", &self.provider)
            .field("url", &self.url)
            .field("headers", &names)
            .field("body_len", &self.body.len())
            .finish()
    }
}

pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Provider-specific wire payload for a neutral request.
    fn build_payload(&self, request: &ProviderRequest) -> Value;

    /// JSON pointers probed in order for the generated text.
    fn response_fields(&self) -> &'static [&'static str];

    /// Endpoint, auth and body for a payload. Fails with `NotConfigured`
    /// when the credential this provider needs is absent.
    fn prepare(&self, payload: &Value) -> Result<OutboundRequest>;

    fn parse_response(&self, body: &Value) -> Completion {
        probe_text(body, self.response_fields())
    }
}

/// First non-blank string found at any of `pointers`, in order.
pub fn probe_text(body: &Value, pointers: &[&str]) -> Completion {
    pointers
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|text| !text.trim().is_empty())
        .map(|text| Completion::Text(text.to_string()))
        .unwrap_or(Completion::NoValidOutput)
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

fn describe_shape(body: &Value) -> String {
    match body {
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("{{{}}}", keys.join(", "))
        }
        Value::Array(items) => format!("array[{}]", items.len()),
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
    }
}

/// Adapters keyed by provider id, sharing one transport.
pub struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    transport: Arc<dyn Transport>,
}

impl ProviderRegistry {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            adapters: HashMap::new(),
            transport,
        }
    }

    /// Registers every known provider. Providers without credentials are
    /// still registered and fail per request with `NotConfigured`.
    pub fn from_config(cfg: &ProvidersConfig, transport: Arc<dyn Transport>) -> Self {
        let mut registry = Self::new(transport);
        registry.register(Arc::new(OpenAiAdapter::new(&cfg.openai)));
        registry.register(Arc::new(GeminiAdapter::new(&cfg.gemini)));
        for family in [
            BedrockFamily::Mistral,
            BedrockFamily::Llama,
            BedrockFamily::Claude,
        ] {
            registry.register(Arc::new(BedrockAdapter::new(family, &cfg.bedrock)));
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: ProviderId) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&id)
    }

    /// One outbound call, no retry. Returns the provider's text or the
    /// failure that ended the call.
    pub async fn invoke(&self, id: ProviderId, request: &ProviderRequest) -> Result<String> {
        let prompt = truncate(&request.prompt, LOG_PROMPT_CHARS);
        let result = self.call(id, request).await;
        match &result {
            Ok(text) => tracing::info!(
                provider = id.as_str(),
                chars = text.chars().count(),
                "Provider call succeeded"
            ),
            Err(e) => tracing::error!(
                provider = id.as_str(),
                prompt = %prompt,
                error = %e,
                "Provider call failed"
            ),
        }
        result
    }

    async fn call(&self, id: ProviderId, request: &ProviderRequest) -> Result<String> {
        let adapter = self
            .adapters
            .get(&id)
            .ok_or_else(|| AgentError::Internal(format!("no adapter registered for {id}")))?;

        let payload = adapter.build_payload(request);
        let outbound = adapter.prepare(&payload)?;
        tracing::debug!(provider = id.as_str(), url = %outbound.url, "Sending provider request");

        let body = self.transport.send(&outbound).await?;
        match adapter.parse_response(&body) {
            Completion::Text(text) => Ok(text),
            Completion::NoValidOutput => {
                tracing::warn!(
                    provider = id.as_str(),
                    shape = %describe_shape(&body),
                    "Provider response carried no recognized text field"
                );
                Err(AgentError::EmptyResponse { provider: id })
            }
        }
    }
}
