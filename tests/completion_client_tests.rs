use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use medvoice::ai::{CompletionClient, CompletionError, CompletionService};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn answer(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer test-key");
    let content = format!(
        "model={} system={} authorized={}",
        body["model"].as_str().unwrap_or_default(),
        body["messages"][0]["content"].as_str().unwrap_or_default(),
        authorized
    );
    (
        StatusCode::OK,
        Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]})),
    )
}

/// Serves one chat-completions endpoint per behaviour and returns the base address
async fn serve() -> String {
    let app = Router::new()
        .route("/ok/chat/completions", post(answer))
        .route(
            "/limited/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        )
        .route(
            "/broken/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        )
        .route(
            "/empty/chat/completions",
            post(|| async { Json(json!({"choices": [{"message": {"content": "  "}}]})) }),
        )
        .route(
            "/nochoice/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str, path: &str) -> CompletionClient {
    CompletionClient::new(format!("{}/{}/", base, path), "test-key", "gpt-test")
}

#[tokio::test]
async fn test_successful_completion_returns_content() {
    let base = serve().await;

    let content = client(&base, "ok")
        .complete("be brief", "hello")
        .await
        .unwrap();

    assert_eq!(content, "model=gpt-test system=be brief authorized=true");
}

#[tokio::test]
async fn test_too_many_requests_is_rate_limited() {
    let base = serve().await;

    let err = client(&base, "limited").complete("s", "u").await.unwrap_err();
    assert!(matches!(err, CompletionError::RateLimited));
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let base = serve().await;

    let err = client(&base, "broken").complete("s", "u").await.unwrap_err();
    match err {
        CompletionError::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_or_missing_content_is_empty_response() {
    let base = serve().await;

    let err = client(&base, "empty").complete("s", "u").await.unwrap_err();
    assert!(matches!(err, CompletionError::EmptyResponse));

    let err = client(&base, "nochoice").complete("s", "u").await.unwrap_err();
    assert!(matches!(err, CompletionError::EmptyResponse));
}

#[tokio::test]
async fn test_unreachable_service_is_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = CompletionClient::new(format!("http://{}", addr), "k", "m")
        .complete("s", "u")
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionError::Request(_)));
}
