//! End-to-end dispatch tests: config → registry → adapter → mock backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::StreamExt;
use vtx_core::{
    AccessToken, ApiShape, AuthError, AuthMethod, ChatRequest, Environment, ModelAuthConfig,
};
use vtx_fetch::{FetchContext, RefreshFn, TokenRefresher};
use vtx_providers::AdapterRegistry;
use wiremock::matchers::{header, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn counting_refresher(calls: Arc<AtomicUsize>) -> Arc<dyn TokenRefresher> {
    Arc::new(RefreshFn(move || {
        let calls = Arc::clone(&calls);
        async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, AuthError>(AccessToken::expiring_in(
                format!("ya29.token-{n}"),
                chrono::Duration::hours(1),
            ))
        }
    }))
}

fn registry(calls: Arc<AtomicUsize>) -> AdapterRegistry {
    let env = Environment {
        project_id: Some("demo".into()),
        ..Environment::default()
    };
    AdapterRegistry::with_refresher(FetchContext::new(env), counting_refresher(calls))
}

#[tokio::test]
async fn claude_config_reaches_raw_predict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/publishers/anthropic/models/claude-sonnet-4:rawPredict$"))
        .and(header("authorization", "Bearer ya29.token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{ "type": "text", "text": "from claude" }],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry(Arc::clone(&calls));
    // chat-completions shape is overridden by the Claude family.
    let config = ModelAuthConfig::new(
        "sonnet",
        "claude-sonnet-4",
        AuthMethod::BearerToken,
        ApiShape::ChatCompletions,
    )
    .with_region("us-east5")
    .with_endpoint(server.uri());

    let adapter = registry.resolve(&config).unwrap();
    let response = adapter
        .send_request(&ChatRequest::prompt("hello", 32))
        .await
        .unwrap();

    assert_eq!(response.content, "from claude");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn each_adapter_owns_its_cache_and_clear_all_resets_them() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"/endpoints/openapi/chat/completions$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "ok" }, "finish_reason": "stop" }]
        })))
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let registry = registry(Arc::clone(&calls));
    let config = |alias: &str| {
        ModelAuthConfig::new(
            alias,
            "meta/llama-3.3-70b-instruct-maas",
            AuthMethod::BearerToken,
            ApiShape::ChatCompletions,
        )
        .with_region("us-central1")
        .with_endpoint(server.uri())
    };

    let a = registry.resolve(&config("a")).unwrap();
    let b = registry.resolve(&config("b")).unwrap();
    let request = ChatRequest::prompt("hi", 8);

    a.send_request(&request).await.unwrap();
    a.send_request(&request).await.unwrap();
    b.send_request(&request).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2, "one refresh per adapter");

    assert_eq!(registry.manager().clear_all(), 2);
    a.send_request(&request).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3, "cleared cache refreshes again");
}

#[tokio::test]
async fn stream_through_resolved_vertex_adapter() {
    let server = MockServer::start().await;
    let sse = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hello\"}]}}]}\n\n",
        "data: not json\n\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" world\"}]},\"finishReason\":\"STOP\"}]}\n\n",
    );
    Mock::given(method("POST"))
        .and(path_regex(r":streamGenerateContent$"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let registry = registry(Arc::new(AtomicUsize::new(0)));
    let config = ModelAuthConfig::new(
        "flash",
        "gemini-2.5-flash",
        AuthMethod::BearerToken,
        ApiShape::VertexNative,
    )
    .with_region("us-central1")
    .with_endpoint(server.uri());

    let adapter = registry.resolve(&config).unwrap();
    assert!(adapter.supports_streaming());

    let text: String = adapter
        .stream_request(&ChatRequest::prompt("hi", 8))
        .await
        .unwrap()
        .map(|chunk| chunk.unwrap().content)
        .collect::<Vec<_>>()
        .await
        .concat();
    assert_eq!(text, "Hello world");
}
