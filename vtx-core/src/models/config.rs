//! Resolved per-model configuration.
//!
//! - [`AuthMethod`] - How a model authenticates (bearer token or an SDK bridge)
//! - [`ApiShape`] - Declared wire shape of the model's endpoint
//! - [`ModelFamily`] - Model family tag used during adapter selection
//! - [`ModelAuthConfig`] - Everything an adapter needs for one alias

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Default Vertex AI region.
pub const DEFAULT_REGION: &str = "us-central1";

/// Default completion budget when a model does not declare one.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

// ============================================================================
// Auth Method
// ============================================================================

/// How a model authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    /// OAuth2 bearer token from the Google credential chain.
    BearerToken,
    /// Anthropic Vertex SDK driven through a Python subprocess.
    AnthropicSdk,
    /// Vertex AI Python SDK driven through a Python subprocess.
    VertexSdk,
}

impl AuthMethod {
    /// Returns the configuration name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BearerToken => "bearer-token",
            Self::AnthropicSdk => "anthropic-sdk",
            Self::VertexSdk => "vertex-sdk",
        }
    }

    /// All known auth methods.
    pub fn all() -> &'static [AuthMethod] {
        &[Self::BearerToken, Self::AnthropicSdk, Self::VertexSdk]
    }

    /// True for the subprocess-driven methods.
    pub fn is_sdk(&self) -> bool {
        matches!(self, Self::AnthropicSdk | Self::VertexSdk)
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::all().iter().map(AuthMethod::as_str).collect();
                AuthError::invalid_config(format!("Unknown auth method '{s}'"))
                    .with_step(format!("Use one of: {}", known.join(", ")))
            })
    }
}

// ============================================================================
// API Shape
// ============================================================================

/// Declared wire shape of a model endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiShape {
    /// OpenAI-compatible `chat/completions` endpoint.
    ChatCompletions,
    /// Vertex AI native `generateContent`.
    VertexNative,
    /// Anthropic messages API via `rawPredict`.
    AnthropicNative,
    /// Reached only through an SDK subprocess.
    Sdk,
}

impl ApiShape {
    /// Returns the configuration name of this shape.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatCompletions => "chat-completions",
            Self::VertexNative => "vertex-native",
            Self::AnthropicNative => "anthropic-native",
            Self::Sdk => "sdk",
        }
    }

    /// All known shapes.
    pub fn all() -> &'static [ApiShape] {
        &[
            Self::ChatCompletions,
            Self::VertexNative,
            Self::AnthropicNative,
            Self::Sdk,
        ]
    }
}

impl fmt::Display for ApiShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiShape {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|shape| shape.as_str() == s)
            .ok_or_else(|| AuthError::invalid_config(format!("Unknown API shape '{s}'")))
    }
}

// ============================================================================
// Model Family
// ============================================================================

/// Model family tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    /// Google Gemini models.
    Gemini,
    /// Anthropic Claude models.
    Claude,
    /// Anything else (Llama, Mistral, ...).
    #[default]
    Other,
}

impl ModelFamily {
    /// Infers the family from a wire-level model identifier.
    pub fn infer(model_id: &str) -> Self {
        let id = model_id
            .rsplit('/')
            .next()
            .unwrap_or(model_id)
            .to_ascii_lowercase();
        if id.starts_with("claude") {
            Self::Claude
        } else if id.starts_with("gemini") {
            Self::Gemini
        } else {
            Self::Other
        }
    }
}

// ============================================================================
// Model Auth Config
// ============================================================================

/// Resolved, validated configuration for one model alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelAuthConfig {
    /// Alias the user selected (e.g. `gemini-flash`).
    pub alias: String,
    /// Human readable name.
    pub display_name: String,
    /// How the model authenticates.
    pub auth_method: AuthMethod,
    /// Declared wire shape.
    pub api_shape: ApiShape,
    /// Model family tag.
    pub family: ModelFamily,
    /// Vertex AI region, or `global`.
    pub region: String,
    /// Custom endpoint host overriding `{region}-aiplatform.googleapis.com`.
    pub endpoint: Option<String>,
    /// Google Cloud project id.
    pub project_id: Option<String>,
    /// Wire-level model identifier.
    pub model_id: String,
    /// Default completion budget.
    pub max_tokens: u32,
}

impl ModelAuthConfig {
    /// Creates a config with defaults for everything but the identifiers.
    pub fn new(
        alias: impl Into<String>,
        model_id: impl Into<String>,
        auth_method: AuthMethod,
        api_shape: ApiShape,
    ) -> Self {
        let alias = alias.into();
        let model_id = model_id.into();
        Self {
            display_name: alias.clone(),
            family: ModelFamily::infer(&model_id),
            alias,
            auth_method,
            api_shape,
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            project_id: None,
            model_id,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the custom endpoint host.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the project id.
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Overrides the inferred family.
    #[must_use]
    pub fn with_family(mut self, family: ModelFamily) -> Self {
        self.family = family;
        self
    }

    /// True if this model belongs to the Claude family.
    pub fn is_claude(&self) -> bool {
        self.family == ModelFamily::Claude
    }
}

// ============================================================================
// Tests
// ============================================================================
