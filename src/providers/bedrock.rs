use chrono::Utc;
use reqwest::Url;
use serde_json::{Value, json};

use super::sigv4::{self, AwsCredentials, SigningParams};
use super::{OutboundRequest, ProviderAdapter, ProviderId, ProviderRequest, Role};
use crate::config::{BedrockConfig, Secret};
use crate::error::{AgentError, Result};

const SERVICE: &str = "bedrock";
const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Model family behind a Bedrock `InvokeModel` call. Each family has its
/// own body schema and its own response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedrockFamily {
    Mistral,
    Llama,
    Claude,
}

#[derive(Debug, Clone)]
enum BedrockAuth {
    Bearer(Secret),
    Keys(AwsCredentials),
    Missing(&'static str),
}

impl BedrockAuth {
    fn from_config(cfg: &BedrockConfig) -> Self {
        if let Some(token) = &cfg.bearer_token {
            return Self::Bearer(token.clone());
        }
        match (&cfg.access_key_id, &cfg.secret_access_key) {
            (Some(id), Some(secret)) => Self::Keys(AwsCredentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
                session_token: cfg.session_token.clone(),
            }),
            (None, _) => Self::Missing("AWS_ACCESS_KEY_ID"),
            (Some(_), None) => Self::Missing("AWS_SECRET_ACCESS_KEY"),
        }
    }
}

pub struct BedrockAdapter {
    family: BedrockFamily,
    model_id: String,
    region: String,
    endpoint: String,
    auth: BedrockAuth,
}

impl BedrockAdapter {
    pub fn new(family: BedrockFamily, cfg: &BedrockConfig) -> Self {
        let model_id = match family {
            BedrockFamily::Mistral => &cfg.mistral_model,
            BedrockFamily::Llama => &cfg.llama_model,
            BedrockFamily::Claude => &cfg.claude_model,
        };
        let endpoint = cfg
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", cfg.region));
        Self {
            family,
            model_id: model_id.clone(),
            region: cfg.region.clone(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            auth: BedrockAuth::from_config(cfg),
        }
    }
}

/// `<s>[INST] … [/INST] answer</s>[INST] … [/INST]`
fn mistral_prompt(request: &ProviderRequest) -> String {
    let mut out = String::from("<s>");
    let mut system = request.system.as_deref();
    let turns = request
        .history
        .iter()
        .map(|t| (t.role, t.text.as_str()))
        .chain(std::iter::once((Role::User, request.prompt.as_str())));
    for (role, text) in turns {
        match role {
            Role::User => {
                out.push_str("[INST] ");
                if let Some(sys) = system.take() {
                    out.push_str(sys);
                    out.push_str("\n\n");
                }
                out.push_str(text);
                out.push_str(" [/INST]");
            }
            Role::Assistant => {
                out.push(' ');
                out.push_str(text);
                out.push_str("</s>");
            }
        }
    }
    out
}

/// Llama 3 chat-token format, ending on an open assistant header.
fn llama_prompt(request: &ProviderRequest) -> String {
    fn block(out: &mut String, role: &str, text: &str) {
        out.push_str("<|start_header_id|>");
        out.push_str(role);
        out.push_str("<|end_header_id|>\n\n");
        out.push_str(text);
        out.push_str("<|eot_id|>");
    }

    let mut out = String::from("<|begin_of_text|>");
    if let Some(system) = &request.system {
        block(&mut out, "system", system);
    }
    for turn in &request.history {
        let role = match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        block(&mut out, role, &turn.text);
    }
    block(&mut out, "user", &request.prompt);
    out.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
    out
}

impl ProviderAdapter for BedrockAdapter {
    fn id(&self) -> ProviderId {
        match self.family {
            BedrockFamily::Mistral => ProviderId::BedrockMistral,
            BedrockFamily::Llama => ProviderId::BedrockLlama,
            BedrockFamily::Claude => ProviderId::BedrockClaude,
        }
    }

    fn build_payload(&self, request: &ProviderRequest) -> Value {
        let params = &request.params;
        match self.family {
            BedrockFamily::Mistral => json!({
                "prompt": mistral_prompt(request),
                "max_tokens": params.max_tokens,
                "temperature": params.temperature,
                "top_p": params.top_p,
            }),
            BedrockFamily::Llama => json!({
                "prompt": llama_prompt(request),
                "max_gen_len": params.max_tokens,
                "temperature": params.temperature,
                "top_p": params.top_p,
            }),
            BedrockFamily::Claude => {
                let mut messages: Vec<Value> = request
                    .history
                    .iter()
                    .map(|turn| {
                        let role = match turn.role {
                            Role::User => "user",
                            Role::Assistant => "assistant",
                        };
                        json!({"role": role, "content": turn.text})
                    })
                    .collect();
                messages.push(json!({"role": "user", "content": request.prompt}));
                let mut payload = json!({
                    "anthropic_version": ANTHROPIC_VERSION,
                    "messages": messages,
                    "max_tokens": params.max_tokens,
                    "temperature": params.temperature,
                    "top_p": params.top_p,
                });
                if let Some(system) = &request.system {
                    payload["system"] = json!(system);
                }
                payload
            }
        }
    }

    fn response_fields(&self) -> &'static [&'static str] {
        match self.family {
            BedrockFamily::Mistral => &["/outputs/0/text", "/completion", "/output", "/generation"],
            BedrockFamily::Llama => &["/generation", "/outputs/0/text", "/completion", "/output"],
            BedrockFamily::Claude => &["/content/0/text", "/completion", "/output"],
        }
    }

    fn prepare(&self, payload: &Value) -> Result<OutboundRequest> {
        let provider = self.id();
        let encoded = sigv4::uri_encode(&self.model_id);
        let url = format!("{}/model/{encoded}/invoke", self.endpoint);
        let request = OutboundRequest::json(provider, url, payload)?;

        match &self.auth {
            BedrockAuth::Missing(missing) => Err(AgentError::NotConfigured {
                provider,
                missing: *missing,
            }),
            BedrockAuth::Bearer(token) => Ok(request.with_header(
                "authorization",
                format!("Bearer {}", token.expose().trim()),
            )),
            BedrockAuth::Keys(creds) => {
                let parsed = Url::parse(&self.endpoint).map_err(|e| {
                    AgentError::Config(format!("invalid Bedrock endpoint {}: {e}", self.endpoint))
                })?;
                let host = match (parsed.host_str(), parsed.port()) {
                    (Some(host), Some(port)) => format!("{host}:{port}"),
                    (Some(host), None) => host.to_string(),
                    (None, _) => {
                        return Err(AgentError::Config(format!(
                            "Bedrock endpoint {} has no host",
                            self.endpoint
                        )));
                    }
                };
                let canonical_uri = format!("/model/{}/invoke", sigv4::uri_encode(&encoded));
                let signed = sigv4::sign(
                    creds,
                    &SigningParams {
                        region: &self.region,
                        service: SERVICE,
                        host: &host,
                        canonical_uri: &canonical_uri,
                        content_type: "application/json",
                        payload: &request.body,
                        time: Utc::now(),
                    },
                );
                Ok(signed
                    .into_iter()
                    .fold(request, |req, (name, value)| req.with_header(name, value)))
            }
        }
    }
}
