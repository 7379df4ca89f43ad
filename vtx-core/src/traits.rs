//! Trait definitions for vtx.
//!
//! This module defines the contract every model backend adapter satisfies.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::AuthError;
use crate::models::{AuthMethod, AuthResult, ChatRequest, ChatResponse, StreamChunk};

/// A stream of response fragments. Dropping it releases the underlying
/// connection or process.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AuthError>> + Send>>;

/// A model backend adapter.
///
/// Implementors are responsible for:
/// - Obtaining credentials (token cache, API key, or SDK prerequisites)
/// - Translating a [`ChatRequest`] into the backend's wire shape
/// - Translating the backend's response (or stream) back
///
/// One instance serves one model alias for the lifetime of the registry
/// that built it, so any token cache it holds is reused across requests.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// The alias this adapter was built for.
    fn model_alias(&self) -> &str;

    /// The auth method this adapter implements.
    fn auth_method(&self) -> AuthMethod;

    /// Attempts authentication. Never fails: errors are carried in the result.
    async fn authenticate(&self) -> AuthResult;

    /// Sends a request and waits for the complete response.
    async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, AuthError>;

    /// Sends a request and streams the response.
    ///
    /// The default wraps [`send_request`](Self::send_request) into a
    /// single-fragment stream.
    async fn stream_request(&self, request: &ChatRequest) -> Result<ResponseStream, AuthError> {
        let response = self.send_request(request).await?;
        let chunk = StreamChunk {
            content: response.content,
            stop_reason: Some(response.stop_reason.unwrap_or_else(|| "stop".to_string())),
        };
        Ok(Box::pin(futures::stream::once(async move { Ok(chunk) })))
    }

    /// True if [`stream_request`](Self::stream_request) streams incrementally.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Checks external prerequisites (libraries, interpreters, packages).
    async fn validate_dependencies(&self) -> bool;

    /// Drops any cached credentials. Best effort.
    fn clear_credentials(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct Echo;

    #[async_trait]
    impl ModelAdapter for Echo {
        fn model_alias(&self) -> &str {
            "echo"
        }

        fn auth_method(&self) -> AuthMethod {
            AuthMethod::VertexSdk
        }

        async fn authenticate(&self) -> AuthResult {
            AuthResult::ok(self.auth_method())
        }

        async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, AuthError> {
            Ok(ChatResponse::text(request.messages[0].content.clone()))
        }

        async fn validate_dependencies(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_default_stream_wraps_send_request() {
        let adapter = Echo;
        assert!(!adapter.supports_streaming());

        let mut stream = adapter
            .stream_request(&ChatRequest::prompt("hello", 16))
            .await
            .unwrap();

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.content, "hello");
        assert_eq!(chunk.stop_reason.as_deref(), Some("stop"));
        assert!(stream.next().await.is_none());
    }
}
