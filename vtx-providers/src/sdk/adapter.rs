//! Adapters backed by a Python SDK subprocess.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use vtx_core::{
    AuthError, AuthMethod, AuthResult, ChatRequest, ChatResponse, Environment, ModelAdapter,
    ModelAuthConfig,
};
use vtx_fetch::FetchContext;

use super::bridge::{SdkBridge, SdkKind, SdkRequest};
use crate::endpoint::resolve_project;

/// Adapter for the `anthropic-sdk` and `vertex-sdk` auth methods.
///
/// The SDK authenticates itself inside the subprocess, so there is no
/// token to cache here.
#[derive(Debug)]
pub struct SdkAdapter {
    config: ModelAuthConfig,
    env: Arc<Environment>,
    bridge: SdkBridge,
}

impl SdkAdapter {
    /// Anthropic Vertex SDK adapter.
    pub fn anthropic(config: ModelAuthConfig, ctx: &FetchContext) -> Self {
        Self::with_kind(config, ctx, SdkKind::Anthropic)
    }

    /// Vertex AI SDK adapter.
    pub fn vertex(config: ModelAuthConfig, ctx: &FetchContext) -> Self {
        Self::with_kind(config, ctx, SdkKind::Vertex)
    }

    fn with_kind(config: ModelAuthConfig, ctx: &FetchContext, kind: SdkKind) -> Self {
        let bridge = SdkBridge::new(Arc::clone(&ctx.process), ctx.env.python(), kind);
        Self::with_bridge(config, Arc::clone(&ctx.env), bridge)
    }

    /// Creates an adapter around an existing bridge.
    pub fn with_bridge(config: ModelAuthConfig, env: Arc<Environment>, bridge: SdkBridge) -> Self {
        Self { config, env, bridge }
    }

    /// The model configuration this adapter serves.
    pub fn config(&self) -> &ModelAuthConfig {
        &self.config
    }

    /// The bridge requests go through.
    pub fn bridge(&self) -> &SdkBridge {
        &self.bridge
    }
}

#[async_trait]
impl ModelAdapter for SdkAdapter {
    fn model_alias(&self) -> &str {
        &self.config.alias
    }

    fn auth_method(&self) -> AuthMethod {
        match self.bridge.kind() {
            SdkKind::Anthropic => AuthMethod::AnthropicSdk,
            SdkKind::Vertex => AuthMethod::VertexSdk,
        }
    }

    async fn authenticate(&self) -> AuthResult {
        if let Err(err) = resolve_project(&self.config, &self.env) {
            return AuthResult::failed(self.auth_method(), err);
        }
        if self.validate_dependencies().await {
            return AuthResult::ok(self.auth_method());
        }

        let kind = self.bridge.kind();
        AuthResult::failed(
            self.auth_method(),
            AuthError::missing_dependency(
                kind.module(),
                format!(
                    "Python SDK '{}' is not available to {}",
                    kind.module(),
                    self.bridge.python()
                ),
            )
            .with_steps([
                format!("{} -m pip install '{}'", self.bridge.python(), kind.package()),
                "Or set VTX_PYTHON_PATH to an interpreter that has it".to_string(),
            ]),
        )
    }

    #[instrument(skip(self, request), fields(alias = %self.config.alias))]
    async fn send_request(&self, request: &ChatRequest) -> Result<ChatResponse, AuthError> {
        let project = resolve_project(&self.config, &self.env)?;
        let system = request.system_prompt();
        let payload = SdkRequest::new(
            request,
            system.as_deref(),
            &self.config.model_id,
            Some(&project),
            &self.config.region,
        );
        debug!(messages = payload.messages.len(), "Invoking SDK bridge");
        self.bridge.invoke(&payload).await
    }

    async fn validate_dependencies(&self) -> bool {
        self.bridge.validate().await
    }
}
