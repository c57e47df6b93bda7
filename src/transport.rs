use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

#[cfg(test)]
use mockall::automock;

use crate::error::{AgentError, Result};
use crate::providers::{OutboundRequest, ProviderId, truncate};

const ERROR_BODY_CHARS: usize = 512;

/// Sends a prepared provider request and returns the decoded JSON body.
///
/// Implementations classify failures: transport problems (including the
/// timeout) are `ProviderUnavailable`, non-2xx statuses are `ProviderError`
/// and a success body that is not JSON is `EmptyResponse`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> Result<Value>;
}

/// reqwest-backed transport. One pooled client for every provider; the
/// timeout bounds the whole exchange, body included. No retries.
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, timeout })
    }

    fn unavailable(&self, provider: ProviderId, err: reqwest::Error) -> AgentError {
        let timed_out = err.is_timeout();
        let detail = if timed_out {
            format!("no response within {}s", self.timeout.as_secs_f32())
        } else {
            // Drop the URL: Gemini and proxies may carry keys in query strings.
            err.without_url().to_string()
        };
        AgentError::ProviderUnavailable {
            provider,
            timed_out,
            detail,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<Value> {
        let provider = request.provider;
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| self.unavailable(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(AgentError::ProviderError {
                provider,
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_CHARS),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.unavailable(provider, e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(
                provider = provider.as_str(),
                error = %e,
                "Provider returned a success status with a non-JSON body"
            );
            AgentError::EmptyResponse { provider }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::json;
    use std::net::SocketAddr;

    async fn spawn_upstream(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        addr
    }

    fn request_to(addr: SocketAddr) -> OutboundRequest {
        OutboundRequest::json(
            ProviderId::Gemini,
            format!("http://{addr}/generate"),
            &json!({"contents": []}),
        )
        .expect("encode payload")
    }

    #[tokio::test]
    async fn test_http_transport_decodes_success_body() {
        let addr = spawn_upstream(Router::new().route(
            "/generate",
            post(|| async { axum::Json(json!({"generation": "ok"})) }),
        ))
        .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let body = transport.send(&request_to(addr)).await.unwrap();
        assert_eq!(body["generation"], "ok");
    }

    #[tokio::test]
    async fn test_http_transport_timeout_is_provider_unavailable() {
        let addr = spawn_upstream(Router::new().route(
            "/generate",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        ))
        .await;

        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        let err = transport.send(&request_to(addr)).await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert!(matches!(
            err,
            AgentError::ProviderUnavailable {
                provider: ProviderId::Gemini,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_http_transport_non_success_is_provider_error() {
        let addr = spawn_upstream(Router::new().route(
            "/generate",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        ))
        .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport.send(&request_to(addr)).await.unwrap_err();
        match err {
            AgentError::ProviderError { status, body, .. } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected ProviderError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_transport_non_json_success_is_empty_response() {
        let addr = spawn_upstream(
            Router::new().route("/generate", post(|| async { "plain text" })),
        )
        .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let err = transport.send(&request_to(addr)).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_http_transport_refused_connection_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let err = transport.send(&request_to(addr)).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::ProviderUnavailable {
                timed_out: false,
                ..
            }
        ));
    }
}
