//! Shared request plumbing for the REST adapters.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};
use vtx_core::{AuthError, ResponseStream};
use vtx_fetch::host::http::ResponseExt;
use vtx_fetch::response::{check_status, looks_like_html, read_json};
use vtx_fetch::sse::into_response_stream;
use vtx_fetch::{EventDecoder, FetchContext, HttpClient, RequestAuth, RequestContext};

/// HTTP transport used by every REST adapter.
#[derive(Debug, Clone)]
pub(crate) struct RestTransport {
    http: Arc<HttpClient>,
    debug: bool,
}

impl RestTransport {
    pub(crate) fn new(ctx: &FetchContext) -> Self {
        Self {
            http: Arc::clone(&ctx.http),
            debug: ctx.debug(),
        }
    }

    /// POSTs `body` and returns the parsed JSON response.
    #[instrument(skip(self, auth, body), fields(model = ctx.model_id))]
    pub(crate) async fn post(
        &self,
        url: &str,
        auth: RequestAuth<'_>,
        body: &Value,
        ctx: RequestContext<'_>,
    ) -> Result<Value, AuthError> {
        let response = self.http.post_json(url, auth, body).await?;
        read_json(response, ctx, self.debug).await
    }

    /// POSTs `body` and decodes the SSE response with `decoder`.
    #[instrument(skip(self, auth, body, decoder), fields(model = ctx.model_id))]
    pub(crate) async fn stream<D: EventDecoder>(
        &self,
        url: &str,
        auth: RequestAuth<'_>,
        body: &Value,
        ctx: RequestContext<'_>,
        decoder: D,
    ) -> Result<ResponseStream, AuthError> {
        let response = self.http.post_json_streaming(url, auth, body).await?;
        let response = check_status(response, ctx).await?;

        let html = response
            .content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));
        if html {
            let body = response.text().await.unwrap_or_default();
            debug!(html = looks_like_html(&body), "Streaming endpoint returned HTML");
            return Err(AuthError::network(
                "Received an HTML error page instead of an event stream",
            )
            .with_step("Check the endpoint host and any proxy configuration"));
        }

        Ok(into_response_stream(response, decoder, self.debug))
    }
}
