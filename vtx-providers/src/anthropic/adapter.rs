//! Bearer-token adapter for Claude models on Vertex AI.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use vtx_core::{
    AuthError, AuthMethod, AuthResult, ChatRequest, ChatResponse, Environment, ModelAdapter,
    ModelAuthConfig, ResponseStream,
};
use vtx_fetch::{CredentialCache, FetchContext, RequestAuth, RequestContext, TokenRefresher};

use super::parser::{AnthropicDecoder, build_body, parse_response};
use crate::endpoint::{anthropic_url, resolve_project};
use crate::rest::RestTransport;

/// Adapter for `…/publishers/anthropic/models/{model}:rawPredict`.
#[derive(Debug)]
pub struct AnthropicRestAdapter {
    config: ModelAuthConfig,
    env: Arc<Environment>,
    transport: RestTransport,
    credentials: CredentialCache,
}

impl AnthropicRestAdapter {
    /// Creates an adapter with its own credential cache over `refresher`.
    pub fn new(
        config: ModelAuthConfig,
        ctx: &FetchContext,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let credentials = CredentialCache::new(format!("anthropic:{}", config.alias), refresher);
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

    fn url(&self, stream: bool) -> Result<String, AuthError> {
        let project = resolve_project(&self.config, &self.env)?;
        Ok(anthropic_url(&self.config, &project, stream))
    }
}

#[async_trait]
impl ModelAdapter for AnthropicRestAdapter {
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
        let url = self.url(false)?;
        let token = self.credentials.get_token().await?;
        let body = build_body(request, false);
        debug!(messages = request.messages.len(), "Sending rawPredict request");

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
        let url = self.url(true)?;
        let token = self.credentials.get_token().await?;
        let body = build_body(request, true);

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
                AnthropicDecoder,
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

    const BASE: &str =
        "/v1/projects/demo/locations/us-east5/publishers/anthropic/models/claude-sonnet-4@20250514";

    fn adapter(server: &MockServer) -> AnthropicRestAdapter {
        let config = ModelAuthConfig::new(
            "sonnet",
            "claude-sonnet-4@20250514",
            AuthMethod::BearerToken,
            ApiShape::AnthropicNative,
        )
        .with_region("us-east5")
        .with_endpoint(server.uri())
        .with_project("demo");
        let refresher = Arc::new(RefreshFn(|| async {
            Ok::<_, AuthError>(AccessToken::expiring_in(
                "ya29.claude",
                chrono::Duration::hours(1),
            ))
        }));
        AnthropicRestAdapter::new(config, &FetchContext::new(Environment::default()), refresher)
    }

    #[tokio::test]
    async fn test_raw_predict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{BASE}:rawPredict")))
            .and(header("authorization", "Bearer ya29.claude"))
            .and(body_partial_json(serde_json::json!({
                "anthropic_version": "vertex-2023-10-16",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "message",
                "content": [{ "type": "text", "text": "Hello" }],
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = adapter(&server)
            .send_request(&ChatRequest::prompt("hi", 64))
            .await
            .unwrap();
        assert_eq!(response.content, "Hello");
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
    }

    #[tokio::test]
    async fn test_stream_raw_predict() {
        let server = MockServer::start().await;
        let sse = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path(format!("{BASE}:streamRawPredict")))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let chunks: Vec<StreamChunk> = adapter(&server)
            .stream_request(&ChatRequest::prompt("hi", 64))
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::text("Hel"),
                StreamChunk::text("lo"),
                StreamChunk::stop("", "end_turn"),
            ]
        );
    }

    #[tokio::test]
    async fn test_forbidden_mentions_iam() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("{\"error\":{\"status\":\"PERMISSION_DENIED\"}}"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .send_request(&ChatRequest::prompt("hi", 64))
            .await
            .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::InvalidCredentials);
        assert!(err.remediation.iter().any(|s| s.contains("aiplatform.user")));
    }

    #[tokio::test]
    async fn test_stream_error_event() {
        let server = MockServer::start().await;
        let sse = "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let results: Vec<_> = adapter(&server)
            .stream_request(&ChatRequest::prompt("hi", 64))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert!(err.message.contains("Overloaded"));
    }
}
