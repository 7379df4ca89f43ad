//! Adapter dispatch and construction cache.
//!
//! The registry turns a [`ModelAuthConfig`] into the adapter that speaks
//! its wire protocol and memoizes the result under `(alias, auth method)`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument};
use vtx_core::{ApiShape, AuthError, AuthMethod, ModelAdapter, ModelAuthConfig};
use vtx_fetch::{FetchContext, TokenRefresher};

use crate::anthropic::AnthropicRestAdapter;
use crate::google_auth::GoogleTokenSource;
use crate::manager::CredentialManager;
use crate::openapi::OpenApiAdapter;
use crate::sdk::SdkAdapter;
use crate::vertex::VertexRestAdapter;

// ============================================================================
// Adapter Kind
// ============================================================================

/// The adapter a config dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Claude over `rawPredict`.
    AnthropicRest,
    /// Gemini over `generateContent`.
    VertexRest,
    /// Any model over the OpenAPI chat-completions endpoint.
    OpenApi,
    /// Anthropic Vertex SDK subprocess.
    AnthropicSdk,
    /// Vertex AI SDK subprocess.
    VertexSdk,
}

impl AdapterKind {
    /// Selects the adapter for `config`.
    ///
    /// Claude-family bearer-token models always use the Anthropic shape,
    /// whatever `api_shape` says.
    pub fn select(config: &ModelAuthConfig) -> Result<Self, AuthError> {
        match (config.auth_method, config.api_shape) {
            (AuthMethod::BearerToken, _) if config.is_claude() => Ok(Self::AnthropicRest),
            (AuthMethod::BearerToken, ApiShape::VertexNative) => Ok(Self::VertexRest),
            (AuthMethod::BearerToken, ApiShape::ChatCompletions) => Ok(Self::OpenApi),
            (AuthMethod::AnthropicSdk, _) => Ok(Self::AnthropicSdk),
            (AuthMethod::VertexSdk, _) => Ok(Self::VertexSdk),
            (method, shape) => Err(AuthError::invalid_config(format!(
                "No adapter for auth method '{method}' with API shape '{shape}' (model '{}')",
                config.alias
            ))
            .with_steps([
                "Use api_shape chat-completions or vertex-native with bearer-token",
                "Or set family: claude for Anthropic models",
            ])),
        }
    }

    /// Short name for logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnthropicRest => "anthropic-rest",
            Self::VertexRest => "vertex-rest",
            Self::OpenApi => "openapi",
            Self::AnthropicSdk => "anthropic-sdk",
            Self::VertexSdk => "vertex-sdk",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Adapter Registry
// ============================================================================

type AdapterKey = (String, AuthMethod);

/// Owned, append-only adapter cache.
pub struct AdapterRegistry {
    ctx: FetchContext,
    refresher: Arc<dyn TokenRefresher>,
    manager: Arc<CredentialManager>,
    adapters: Mutex<HashMap<AdapterKey, Arc<dyn ModelAdapter>>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("ctx", &self.ctx)
            .field("adapters", &self.len())
            .finish_non_exhaustive()
    }
}

impl AdapterRegistry {
    /// Creates a registry whose bearer-token adapters use the Google
    /// credential chain.
    pub fn new(ctx: FetchContext) -> Self {
        let refresher: Arc<dyn TokenRefresher> = Arc::new(GoogleTokenSource::new(&ctx));
        Self::with_refresher(ctx, refresher)
    }

    /// Creates a registry with a custom token source.
    pub fn with_refresher(ctx: FetchContext, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            ctx,
            refresher,
            manager: Arc::new(CredentialManager::new()),
            adapters: Mutex::new(HashMap::new()),
        }
    }

    /// Registers new adapters with `manager` instead of a private one.
    #[must_use]
    pub fn with_manager(mut self, manager: Arc<CredentialManager>) -> Self {
        self.manager = manager;
        self
    }

    /// The cleanup registry adapters are registered with.
    pub fn manager(&self) -> &Arc<CredentialManager> {
        &self.manager
    }

    /// The host context adapters are built with.
    pub fn context(&self) -> &FetchContext {
        &self.ctx
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AdapterKey, Arc<dyn ModelAdapter>>> {
        self.adapters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the adapter for `config`, building it on first use.
    ///
    /// The same `(alias, auth method)` always yields the same instance.
    #[instrument(skip(self, config), fields(alias = %config.alias, method = %config.auth_method))]
    pub fn resolve(&self, config: &ModelAuthConfig) -> Result<Arc<dyn ModelAdapter>, AuthError> {
        let key = (config.alias.clone(), config.auth_method);
        if let Some(existing) = self.lock().get(&key) {
            debug!("Adapter cache hit");
            return Ok(Arc::clone(existing));
        }

        let kind = AdapterKind::select(config)?;
        let built = self.build(kind, config.clone());

        let adapter = match self.lock().entry(key) {
            Entry::Occupied(entry) => {
                debug!("Adapter built concurrently; keeping the first");
                Arc::clone(entry.get())
            }
            Entry::Vacant(entry) => {
                info!(kind = %kind, model = %config.model_id, "Created adapter");
                self.manager.register(&built);
                Arc::clone(entry.insert(built))
            }
        };
        Ok(adapter)
    }

    fn build(&self, kind: AdapterKind, config: ModelAuthConfig) -> Arc<dyn ModelAdapter> {
        let refresher = Arc::clone(&self.refresher);
        match kind {
            AdapterKind::AnthropicRest => {
                Arc::new(AnthropicRestAdapter::new(config, &self.ctx, refresher))
            }
            AdapterKind::VertexRest => Arc::new(VertexRestAdapter::new(config, &self.ctx, refresher)),
            AdapterKind::OpenApi => Arc::new(OpenApiAdapter::new(config, &self.ctx, refresher)),
            AdapterKind::AnthropicSdk => Arc::new(SdkAdapter::anthropic(config, &self.ctx)),
            AdapterKind::VertexSdk => Arc::new(SdkAdapter::vertex(config, &self.ctx)),
        }
    }

    /// Cached adapter for `(alias, method)`, if any.
    pub fn get(&self, alias: &str, method: AuthMethod) -> Option<Arc<dyn ModelAdapter>> {
        self.lock().get(&(alias.to_string(), method)).cloned()
    }

    /// Number of cached adapters.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every cached adapter.
    pub fn clear(&self) {
        let mut adapters = self.lock();
        debug!(count = adapters.len(), "Clearing adapter registry");
        adapters.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
