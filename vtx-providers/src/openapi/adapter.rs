//! Bearer-token adapter for the OpenAPI chat-completions endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use vtx_core::{
    AuthError, AuthMethod, AuthResult, ChatRequest, ChatResponse, Environment, ModelAdapter,
    ModelAuthConfig, ResponseStream,
};
use vtx_fetch::{CredentialCache, FetchContext, RequestAuth, RequestContext, TokenRefresher};

use super::parser::{ChatCompletionsDecoder, build_body, parse_response};
use crate::endpoint::{openapi_url, resolve_project};
use crate::rest::RestTransport;

/// Adapter for `…/endpoints/openapi/chat/completions`.
#[derive(Debug)]
pub struct OpenApiAdapter {
    config: ModelAuthConfig,
    env: Arc<Environment>,
    transport: RestTransport,
    credentials: CredentialCache,
}

impl OpenApiAdapter {
    /// Creates an adapter with its own credential cache over `refresher`.
    pub fn new(
        config: ModelAuthConfig,
        ctx: &FetchContext,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let credentials = CredentialCache::new(format!("openapi:{}", config.alias), refresher);
        Self {
            env: Arc::clone(&ctx.env),
            transport: RestTransport::new(ctx),
            credentials,
            config,
        }
    }

    /// The model configuration this adapter serves.
    pub fn config(&self) -> &ModelAuthConfig {
        &self.config
    }

    fn url(&self) -> Result<String, AuthError> {
        let project = resolve_project(&self.config, &self.env)?;
        Ok(openapi_url(&self.config, &project))
    }
}

#[async_trait]
impl ModelAdapter for OpenApiAdapter {
    fn model_alias(&self) -> &str {
        &self.config.alias
    }

    fn auth_method(&self) -> AuthMethod {
        AuthMethod::BearerToken
    }

    async fn authenticate(&self) -> AuthResult {
        AuthResult::from_token_result(self.auth_method(), self.credentials.get_token().await)
    }

    #[instrument(skip(self, request), fields(alias = %self.config.alias))]
    async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, AuthError> {
        let url = self.url()?;
        let token = self.credentials.get_token().await?;
        let body = build_body(&self.config.model_id, request, false);
        debug!(messages = request.messages.len(), "Sending chat-completions request");

        let ctx = RequestContext {
            endpoint: &url,
            model_id: &self.config.model_id,
        };
        let value = self
            .transport
            .post(&url, RequestAuth::Bearer(&token.token), &body, ctx)
            .await?;
        parse_response(value)
    }

    #[instrument(skip(self, request), fields(alias = %self.config.alias))]
    async fn stream_request(&self, request: &ChatRequest) -> Result<ResponseStream, AuthError> {
        let url = self.url()?;
        let token = self.credentials.get_token().await?;
        let body = build_body(&self.config.model_id, request, true);

        let ctx = RequestContext {
            endpoint: &url,
            model_id: &self.config.model_id,
        };
        self.transport
            .stream(
                &url,
                RequestAuth::Bearer(&token.token),
                &body,
                ctx,
                ChatCompletionsDecoder,
            )
            .await
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn validate_dependencies(&self) -> bool {
        true
    }

    fn clear_credentials(&self) {
        self.credentials.clear_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use vtx_core::{AccessToken, ApiShape, AuthErrorCode, StreamChunk};
    use vtx_fetch::RefreshFn;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PATH: &str =
        "/v1/projects/demo/locations/us-south1/endpoints/openapi/chat/completions";

    fn adapter(server: &MockServer) -> OpenApiAdapter {
        let config = ModelAuthConfig::new(
            "flash",
            "google/gemini-2.0-flash",
            AuthMethod::BearerToken,
            ApiShape::ChatCompletions,
        )
        .with_region("us-south1")
        .with_endpoint(server.uri())
        .with_project("demo");
        let refresher = Arc::new(RefreshFn(|| async {
            Ok::<_, AuthError>(AccessToken::expiring_in(
                "ya29.test",
                chrono::Duration::hours(1),
            ))
        }));
        OpenApiAdapter::new(config, &FetchContext::new(Environment::default()), refresher)
    }

    #[tokio::test]
    async fn test_send_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_partial_json(serde_json::json!({
                "model": "google/gemini-2.0-flash",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "Austin" }, "finish_reason": "stop" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = adapter(&server)
            .send_request(&ChatRequest::prompt("Capital of Texas?", 64))
            .await
            .unwrap();
        assert_eq!(response.content, "Austin");
    }

    #[tokio::test]
    async fn test_html_page_with_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<!DOCTYPE html><html><body>Sign in</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let err = adapter(&server)
            .send_request(&ChatRequest::prompt("hi", 16))
            .await
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::NetworkError);
        assert!(err.message.contains("HTML"));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "20")
                    .set_body_string("{\"error\":{\"code\":429}}"),
            )
            .mount(&server)
            .await;

        let err = adapter(&server)
            .send_request(&ChatRequest::prompt("hi", 16))
            .await
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::NetworkError);
        assert!(err.message.contains("20 seconds"));
    }

    #[tokio::test]
    async fn test_not_found_names_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .send_request(&ChatRequest::prompt("hi", 16))
            .await
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidConfig);
        assert!(err.message.contains("google/gemini-2.0-flash"));
    }

    #[tokio::test]
    async fn test_stream_request() {
        let server = MockServer::start().await;
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
                   data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n\
                   data: [DONE]\n\n";
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let adapter = adapter(&server);
        assert!(adapter.supports_streaming());
        let chunks: Vec<StreamChunk> = adapter
            .stream_request(&ChatRequest::prompt("hi", 16))
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![StreamChunk::text("Hi"), StreamChunk::stop("", "stop")]
        );
    }

    #[tokio::test]
    async fn test_missing_project() {
        let server = MockServer::start().await;
        let mut adapter = adapter(&server);
        adapter.config.project_id = None;

        let err = adapter
            .send_request(&ChatRequest::prompt("hi", 16))
            .await
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::MissingEnvVar);
    }

    #[tokio::test]
    async fn test_authenticate_and_clear() {
        let server = MockServer::start().await;
        let adapter = adapter(&server);

        let result = adapter.authenticate().await;
        assert!(result.success);
        assert!(result.expires_at.is_some());

        adapter.clear_credentials();
        assert!(!adapter.credentials.is_authenticated());
    }
}
