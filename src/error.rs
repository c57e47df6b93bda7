use thiserror::Error;

use crate::providers::ProviderId;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Every failure a request can end in. Nothing is retried; each variant is
/// terminal for the request that produced it.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    Validation(String),

    #[error("{provider} unavailable: {detail}")]
    ProviderUnavailable {
        provider: ProviderId,
        timed_out: bool,
        detail: String,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    ProviderError {
        provider: ProviderId,
        status: u16,
        body: String,
    },

    #[error("{provider} returned no usable text")]
    EmptyResponse { provider: ProviderId },

    #[error("{provider} is not configured: {missing} is not set")]
    NotConfigured {
        provider: ProviderId,
        missing: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable {
                timed_out: true,
                ..
            }
        )
    }

    /// The provider involved, if the failure came from a provider call.
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            Self::ProviderUnavailable { provider, .. }
            | Self::ProviderError { provider, .. }
            | Self::EmptyResponse { provider }
            | Self::NotConfigured { provider, .. } => Some(*provider),
            _ => None,
        }
    }

    /// Message safe to hand back to API callers. Provider bodies and
    /// transport internals stay in the logs.
    pub fn public_detail(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::ProviderUnavailable {
                provider,
                timed_out: true,
                ..
            } => format!("External API Error: {provider} request timed out"),
            Self::ProviderUnavailable { provider, .. } => {
                format!("External API Error: {provider} is unreachable")
            }
            Self::ProviderError { provider, .. } => format!("{provider} API Error"),
            Self::EmptyResponse { provider } => {
                format!("{provider} returned an empty response.")
            }
            Self::NotConfigured { provider, .. } => format!("{provider} is not configured."),
            Self::Config(_) | Self::Internal(_) | Self::Other(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }
}
