use super::*;
use crate::config::Config;
use crate::providers::ProviderRegistry;
use crate::transport::{HttpTransport, MockTransport, Transport};

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, header};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::time::Duration;
use tower::ServiceExt;

fn configured() -> Config {
    let mut cfg = Config::default();
    cfg.providers.openai.api_key = Some("sk-test".into());
    cfg.providers.gemini.api_key = Some("g-test".into());
    cfg.providers.bedrock.bearer_token = Some("br-test".into());
    cfg
}

fn app_with(cfg: &Config, transport: Arc<dyn Transport>) -> Router {
    let registry = ProviderRegistry::from_config(&cfg.providers, transport);
    let dispatcher = Dispatcher::new(Arc::new(registry), cfg);
    router(AppState::new(Arc::new(dispatcher)), &cfg.server)
}

fn app(transport: MockTransport) -> Router {
    app_with(&configured(), Arc::new(transport))
}

fn silent() -> MockTransport {
    let mut transport = MockTransport::new();
    transport.expect_send().times(0);
    transport
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let response = app(silent())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_pre_built_over_http() {
    let (status, body) = send(
        app(silent()),
        post_json("/ai-agent/", json!({"prompt": "Science", "mode": "pre-built"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"response": ["Describe Newton's First Law", "Explain the process of photosynthesis"]})
    );
}

#[tokio::test]
async fn test_route_without_trailing_slash() {
    let (status, body) = send(
        app(silent()),
        post_json("/ai-agent", json!({"prompt": "geometry", "mode": "teacher-contributed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["response"],
        "👩‍🏫 Teacher-created assessments for 'geometry' are coming soon!"
    );
}

#[tokio::test]
async fn test_unknown_mode_is_400_without_provider_call() {
    let (status, body) = send(
        app(silent()),
        post_json("/ai-agent/", json!({"prompt": "math", "mode": "random"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "Invalid mode. Use 'pre-built', 'ai-generated', or 'teacher-contributed'."
    );
}

#[tokio::test]
async fn test_missing_fields_are_400() {
    let (status, body) = send(app(silent()), post_json("/ai-agent/", json!({"prompt": "math"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Prompt and mode are required.");
}

#[tokio::test]
async fn test_chat_with_blank_history_is_400_without_provider_call() {
    let mut cfg = configured();
    cfg.routing.chat = crate::providers::ProviderId::BedrockClaude;
    let (status, body) = send(
        app_with(&cfg, Arc::new(silent())),
        post_json(
            "/chat",
            json!({"message": "what is 2+2?", "history": ["hi", "", "   "]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "History entries must not be empty.");
}

#[tokio::test]
async fn test_chat_with_unpaired_history_is_400() {
    let (status, body) = send(
        app(silent()),
        post_json(
            "/chat",
            json!({"message": "and 3+3?", "history": ["2+2?", "4", "5+5?"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "History must alternate user and assistant turns and end with an assistant reply."
    );
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app(silent()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_chat_reply_carries_type() {
    let mut transport = MockTransport::new();
    transport
        .expect_send()
        .times(1)
        .returning(|_| Ok(json!({"choices": [{"message": {"content": "Q1. What is 1/2 + 1/4?"}}]})));
    let (status, body) = send(
        app(transport),
        post_json("/chat", json!({"message": "Generate 3 questions on fractions"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"type": "assessment", "response": "Q1. What is 1/2 + 1/4?"}));
}

#[tokio::test]
async fn test_provider_error_is_500_with_sanitized_detail() {
    let mut transport = MockTransport::new();
    transport.expect_send().times(1).returning(|req| {
        Err(AgentError::ProviderError {
            provider: req.provider,
            status: 401,
            body: "invalid api key sk-test".to_string(),
        })
    });
    let (status, body) = send(
        app(transport),
        post_json(
            "/generate-assessment",
            json!({"topic": "Fractions", "grade": "5", "subject": "Math", "curriculum": "CBSE"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "OpenAI API Error"}));
}

#[tokio::test]
async fn test_empty_provider_body_is_500() {
    let mut transport = MockTransport::new();
    transport.expect_send().times(1).returning(|_| Ok(json!({"foo": "bar"})));
    let (status, body) = send(
        app(transport),
        post_json("/feedback/generate", json!({"question": "2+2?", "answer": "4"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Bedrock Claude returned an empty response.");
}

#[tokio::test]
async fn test_missing_credential_is_503() {
    let mut cfg = configured();
    cfg.providers.gemini.api_key = None;
    let (status, body) = send(
        app_with(&cfg, Arc::new(silent())),
        post_json("/ai-agent/", json!({"prompt": "world rivers", "mode": "ai-generated"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Gemini is not configured.");
}

#[tokio::test]
async fn test_evaluate_answer_over_http() {
    let (status, body) = send(
        app(silent()),
        post_json("/evaluate-answer", json!({"answer": "b", "correct_answer": "C"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"correct": false, "response": "❌ Incorrect.", "correct_answer": "C"})
    );
}

#[tokio::test]
async fn test_catalog_lists_subjects() {
    let (status, body) = send(
        app(silent()),
        Request::get("/assessments").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["math"][0], "Solve x in 2x + 5 = 15");
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/chat")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app(silent()).oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
}

async fn spawn_stalled_upstream() -> SocketAddr {
    let upstream = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "late"
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, upstream).await;
    });
    addr
}

#[tokio::test]
async fn test_provider_timeout_is_502() {
    let addr = spawn_stalled_upstream().await;
    let mut cfg = configured();
    cfg.providers.gemini.base_url = format!("http://{addr}/v1beta");
    let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();

    let (status, body) = send(
        app_with(&cfg, Arc::new(transport)),
        post_json("/ai-agent/", json!({"prompt": "solar system", "mode": "ai-generated"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["detail"], "External API Error: Gemini request timed out");
}
