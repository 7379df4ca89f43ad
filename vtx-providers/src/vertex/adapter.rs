//! Adapter for the native Vertex AI `generateContent` API.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use vtx_core::{
    AccessToken, AuthError, AuthMethod, AuthResult, ChatRequest, ChatResponse, Environment,
    ModelAdapter, ModelAuthConfig, ResponseStream,
};
use vtx_fetch::{CredentialCache, FetchContext, RequestAuth, RequestContext, TokenRefresher};

use super::parser::{VertexDecoder, build_body, parse_response};
use crate::endpoint::{resolve_project, vertex_url};
use crate::rest::RestTransport;

/// How requests are authenticated.
enum VertexAuth {
    /// `GOOGLE_API_KEY` in the query string; no token cache involved.
    ApiKey(String),
    /// OAuth bearer token from the credential cache.
    Bearer(CredentialCache),
}

impl std::fmt::Debug for VertexAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            Self::Bearer(cache) => f.debug_tuple("Bearer").field(cache).finish(),
        }
    }
}

/// Credential resolved for one request. Each variant selects its own
/// [`RequestAuth`] mode.
enum Credential<'a> {
    ApiKey(&'a str),
    Bearer(AccessToken),
}

impl Credential<'_> {
    fn request_auth(&self) -> RequestAuth<'_> {
        match self {
            Self::ApiKey(key) => RequestAuth::ApiKey(key),
            Self::Bearer(token) => RequestAuth::Bearer(&token.token),
        }
    }
}

/// Adapter for `…/publishers/google/models/{model}:generateContent`.
#[derive(Debug)]
pub struct VertexRestAdapter {
    config: ModelAuthConfig,
    env: Arc<Environment>,
    transport: RestTransport,
    auth: VertexAuth,
}

impl VertexRestAdapter {
    /// Creates an adapter. With `GOOGLE_API_KEY` set the API-key path is
    /// used and `refresher` is never called.
    pub fn new(
        config: ModelAuthConfig,
        ctx: &FetchContext,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let auth = match ctx.env.api_key.clone() {
            Some(key) => {
                info!(alias = %config.alias, "Using API key authentication for Vertex AI");
                VertexAuth::ApiKey(key)
            }
            None => VertexAuth::Bearer(CredentialCache::new(
                format!("vertex:{}", config.alias),
                refresher,
            )),
        };
        Self {
            env: Arc::clone(&ctx.env),
            transport: RestTransport::new(ctx),
            auth,
            config,
        }
    }

    /// The model configuration this adapter serves.
    pub fn config(&self) -> &ModelAuthConfig {
        &self.config
    }

    /// True if requests carry an API key instead of a bearer token.
    pub fn uses_api_key(&self) -> bool {
        matches!(self.auth, VertexAuth::ApiKey(_))
    }

    async fn credential(&self) -> Result<Credential<'_>, AuthError> {
        match &self.auth {
            VertexAuth::ApiKey(key) => Ok(Credential::ApiKey(key)),
            VertexAuth::Bearer(cache) => Ok(Credential::Bearer(cache.get_token().await?)),
        }
    }

    fn url(&self, stream: bool) -> Result<String, AuthError> {
        match self.auth {
            VertexAuth::ApiKey(_) => Ok(vertex_url(&self.config, None, stream)),
            VertexAuth::Bearer(_) => {
                let project = resolve_project(&self.config, &self.env)?;
                Ok(vertex_url(&self.config, Some(&project), stream))
            }
        }
    }
}

#[async_trait]
impl ModelAdapter for VertexRestAdapter {
    fn model_alias(&self) -> &str {
        &self.config.alias
    }

    fn auth_method(&self) -> AuthMethod {
        AuthMethod::BearerToken
    }

    async fn authenticate(&self) -> AuthResult {
        match &self.auth {
            VertexAuth::ApiKey(_) => AuthResult::ok(self.auth_method()),
            VertexAuth::Bearer(cache) => {
                AuthResult::from_token_result(self.auth_method(), cache.get_token().await)
            }
        }
    }

    #[instrument(skip(self, request), fields(alias = %self.config.alias))]
    async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, AuthError> {
        let url = self.url(false)?;
        let credential = self.credential().await?;
        debug!(api_key = self.uses_api_key(), "Sending generateContent request");

        let ctx = RequestContext {
            endpoint: &url,
            model_id: &self.config.model_id,
        };
        let value = self
            .transport
            .post(&url, credential.request_auth(), &build_body(request), ctx)
            .await?;
        parse_response(value)
    }

    #[instrument(skip(self, request), fields(alias = %self.config.alias))]
    async fn stream_request(&self, request: &ChatRequest) -> Result<ResponseStream, AuthError> {
        let url = self.url(true)?;
        let credential = self.credential().await?;

        let ctx = RequestContext {
            endpoint: &url,
            model_id: &self.config.model_id,
        };
        self.transport
            .stream(
                &url,
                credential.request_auth(),
                &build_body(request),
                ctx,
                VertexDecoder,
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
        if let VertexAuth::Bearer(cache) = &self.auth {
            cache.clear_cache();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vtx_core::{ApiShape, AuthErrorCode, StreamChunk};
    use vtx_fetch::RefreshFn;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str =
        "/v1/projects/demo/locations/us-central1/publishers/google/models/gemini-2.5-flash";

    fn config(server: &MockServer) -> ModelAuthConfig {
        ModelAuthConfig::new(
            "flash",
            "gemini-2.5-flash",
            AuthMethod::BearerToken,
            ApiShape::VertexNative,
        )
        .with_endpoint(server.uri())
    }

    fn counting_refresher(calls: Arc<AtomicUsize>) -> Arc<dyn TokenRefresher> {
        Arc::new(RefreshFn(move || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, AuthError>(AccessToken::expiring_in(
                    "ya29.vertex",
                    chrono::Duration::hours(1),
                ))
            }
        }))
    }

    fn ok_body() -> serde_json::Value {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "pong" }] }, "finishReason": "STOP" }]
        })
    }

    #[tokio::test]
    async fn test_bearer_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{MODEL_PATH}:generateContent")))
            .and(header("authorization", "Bearer ya29.vertex"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(2)
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let env = Environment {
            project_id: Some("demo".into()),
            ..Environment::default()
        };
        let adapter = VertexRestAdapter::new(
            config(&server),
            &FetchContext::new(env),
            counting_refresher(Arc::clone(&calls)),
        );

        for _ in 0..2 {
            let response = adapter.send_request(&ChatRequest::prompt("ping", 8)).await.unwrap();
            assert_eq!(response.content, "pong");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1, "token is cached between requests");
    }

    #[tokio::test]
    async fn test_api_key_bypasses_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/publishers/google/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "AIzaTestKey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
            .expect(1)
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let env = Environment {
            api_key: Some("AIzaTestKey".into()),
            ..Environment::default()
        };
        let adapter = VertexRestAdapter::new(
            config(&server),
            &FetchContext::new(env),
            counting_refresher(Arc::clone(&calls)),
        );
        assert!(adapter.uses_api_key());
        assert!(adapter.authenticate().await.success);

        let response = adapter.send_request(&ChatRequest::prompt("ping", 8)).await.unwrap();
        assert_eq!(response.content, "pong");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_credential_selects_request_auth() {
        let key = Credential::ApiKey("AIzaTestKey");
        assert!(matches!(key.request_auth(), RequestAuth::ApiKey("AIzaTestKey")));

        let token = Credential::Bearer(AccessToken::non_expiring("ya29.test"));
        assert!(matches!(token.request_auth(), RequestAuth::Bearer("ya29.test")));
    }

    #[tokio::test]
    async fn test_stream_generate_content() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"po\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ng\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );
        Mock::given(method("POST"))
            .and(path(format!("{MODEL_PATH}:streamGenerateContent")))
            .and(query_param("alt", "sse"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
            .mount(&server)
            .await;

        let adapter = VertexRestAdapter::new(
            config(&server).with_project("demo"),
            &FetchContext::new(Environment::default()),
            counting_refresher(Arc::new(AtomicUsize::new(0))),
        );
        let chunks: Vec<StreamChunk> = adapter
            .stream_request(&ChatRequest::prompt("ping", 8))
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::text("po"),
                StreamChunk::text("ng"),
                StreamChunk::stop("", "STOP"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_surfaces() {
        let adapter = VertexRestAdapter::new(
            ModelAuthConfig::new("flash", "gemini-2.5-flash", AuthMethod::BearerToken, ApiShape::VertexNative)
                .with_project("demo"),
            &FetchContext::new(Environment::default()),
            Arc::new(RefreshFn(|| async {
                Err::<AccessToken, _>(AuthError::missing_credentials("no credentials"))
            })),
        );

        let result = adapter.authenticate().await;
        assert!(!result.success);
        assert_eq!(result.error.unwrap().code, AuthErrorCode::MissingCredentials);
    }
}
