use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::providers::{GenerationParams, ProviderId};

/// Main configuration structure for the assessment agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub routing: RoutingConfig,
    pub generation: GenerationParams,
    /// Extra pre-built subjects merged over the built-in table.
    pub pre_built: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub timeout_seconds: u64,
    pub openai: OpenAiConfig,
    pub gemini: GeminiConfig,
    pub bedrock: BedrockConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<Secret>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<Secret>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BedrockConfig {
    pub region: String,
    /// Overrides `https://bedrock-runtime.{region}.amazonaws.com`.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<Secret>,
    pub session_token: Option<Secret>,
    /// Bedrock API key; preferred over access keys when both are set.
    pub bearer_token: Option<Secret>,
    pub mistral_model: String,
    pub llama_model: String,
    pub claude_model: String,
}

/// Which provider serves each endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub ai_agent: ProviderId,
    pub chat: ProviderId,
    pub assessment: ProviderId,
    pub feedback: ProviderId,
}

impl RoutingConfig {
    pub fn routes(&self) -> [(&'static str, ProviderId); 4] {
        [
            ("ai_agent", self.ai_agent),
            ("chat", self.chat),
            ("assessment", self.assessment),
            ("feedback", self.feedback),
        ]
    }
}

/// Credential string. Serializes as-is but never prints in `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("ASSESSA_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
        let mut config = Self::from_file(&config_path);
        config.apply_env_overrides(|key| env::var(key).ok());

        for warning in config.validate() {
            tracing::warn!("Config validation warning: {} - continuing anyway", warning);
        }

        config
    }

    fn from_file(config_path: &str) -> Self {
        if !Path::new(config_path).exists() {
            tracing::warn!("Config file not found at {} - using defaults", config_path);
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(contents) => match Self::from_yaml(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path);
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    config_path,
                    e
                );
                Self::default()
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// Apply environment variable overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Server overrides
        if let Some(bind) = var("ASSESSA_BIND") {
            self.server.bind = bind;
        }
        if let Some(origins) = var("ASSESSA_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        // Provider call timeout
        if let Some(timeout) = var("ASSESSA_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.providers.timeout_seconds = secs;
            }
        }

        // Routing overrides
        for (key, slot) in [
            ("ASSESSA_AI_AGENT_PROVIDER", &mut self.routing.ai_agent),
            ("ASSESSA_CHAT_PROVIDER", &mut self.routing.chat),
            ("ASSESSA_ASSESSMENT_PROVIDER", &mut self.routing.assessment),
            ("ASSESSA_FEEDBACK_PROVIDER", &mut self.routing.feedback),
        ] {
            if let Some(value) = var(key) {
                match value.parse() {
                    Ok(id) => *slot = id,
                    Err(e) => tracing::warn!("Ignoring {}: {}", key, e),
                }
            }
        }

        // OpenAI overrides
        if let Some(key) = var("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(Secret(key));
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.providers.openai.model = model;
        }
        if let Some(base) = var("OPENAI_BASE_URL") {
            self.providers.openai.base_url = base;
        }

        // Gemini overrides
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.providers.gemini.api_key = Some(Secret(key));
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.providers.gemini.model = model;
        }
        if let Some(base) = var("GEMINI_BASE_URL") {
            self.providers.gemini.base_url = base;
        }

        // Bedrock overrides
        let bedrock = &mut self.providers.bedrock;
        if let Some(region) = var("AWS_MODEL_REGION").or_else(|| var("AWS_REGION")) {
            bedrock.region = region;
        }
        if let Some(endpoint) = var("BEDROCK_ENDPOINT") {
            bedrock.endpoint = Some(endpoint);
        }
        if let Some(id) = var("AWS_ACCESS_KEY_ID") {
            bedrock.access_key_id = Some(id);
        }
        if let Some(secret) = var("AWS_SECRET_ACCESS_KEY") {
            bedrock.secret_access_key = Some(Secret(secret));
        }
        if let Some(token) = var("AWS_SESSION_TOKEN") {
            bedrock.session_token = Some(Secret(token));
        }
        if let Some(token) = var("AWS_BEARER_TOKEN_BEDROCK") {
            bedrock.bearer_token = Some(Secret(token));
        }
        if let Some(model) = var("BEDROCK_MISTRAL_MODEL") {
            bedrock.mistral_model = model;
        }
        if let Some(model) = var("BEDROCK_LLAMA_MODEL").or_else(|| var("MODEL_ID")) {
            bedrock.llama_model = model;
        }
        if let Some(model) = var("BEDROCK_CLAUDE_MODEL") {
            bedrock.claude_model = model;
        }
    }

    /// Problems worth a warning at startup. None of them stop the server:
    /// a routed provider without credentials fails its own requests.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.providers.timeout_seconds == 0 {
            warnings.push("providers.timeout_seconds is 0; requests will time out immediately".to_string());
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            warnings.push("generation.temperature should be between 0.0 and 2.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            warnings.push("generation.top_p should be between 0.0 and 1.0".to_string());
        }
        if self.generation.max_tokens == 0 {
            warnings.push("generation.max_tokens cannot be 0".to_string());
        }

        for (route, provider) in self.routing.routes() {
            if let Some(missing) = self.missing_credential(provider) {
                warnings.push(format!(
                    "{route} is routed to {provider} but {missing} is not set; those requests will fail"
                ));
            }
        }

        warnings
    }

    /// Name of the first credential `provider` needs that is absent.
    pub fn missing_credential(&self, provider: ProviderId) -> Option<&'static str> {
        let p = &self.providers;
        match provider {
            ProviderId::OpenAi => p.openai.api_key.is_none().then_some("OPENAI_API_KEY"),
            ProviderId::Gemini => p.gemini.api_key.is_none().then_some("GOOGLE_API_KEY"),
            ProviderId::BedrockMistral | ProviderId::BedrockLlama | ProviderId::BedrockClaude => {
                let b = &p.bedrock;
                if b.bearer_token.is_some() {
                    None
                } else if b.access_key_id.is_none() {
                    Some("AWS_ACCESS_KEY_ID")
                } else if b.secret_access_key.is_none() {
                    Some("AWS_SECRET_ACCESS_KEY")
                } else {
                    None
                }
            }
        }
    }

    /// Get provider timeout as Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            providers: ProvidersConfig::default(),
            routing: RoutingConfig::default(),
            generation: GenerationParams::default(),
            pre_built: BTreeMap::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            openai: OpenAiConfig::default(),
            gemini: GeminiConfig::default(),
            bedrock: BedrockConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            bearer_token: None,
            mistral_model: "mistral.mistral-large-2402-v1:0".to_string(),
            llama_model: "meta.llama3-70b-instruct-v1:0".to_string(),
            claude_model: "anthropic.claude-3-5-sonnet-20240620-v1:0".to_string(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ai_agent: ProviderId::Gemini,
            chat: ProviderId::OpenAi,
            assessment: ProviderId::OpenAi,
            feedback: ProviderId::BedrockClaude,
        }
    }
}
