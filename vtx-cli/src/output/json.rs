//! JSON output formatting.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use vtx_core::{AuthError, AuthResult, ChatResponse, ModelAuthConfig};
use vtx_providers::AdapterKind;

// ============================================================================
// Output Types
// ============================================================================

/// One catalog entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutput {
    pub alias: String,
    pub name: String,
    pub model_id: String,
    pub auth_method: String,
    pub api_shape: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl ModelOutput {
    /// Builds the row for a config and the adapter it dispatches to.
    pub fn new(config: &ModelAuthConfig, kind: Option<AdapterKind>) -> Self {
        Self {
            alias: config.alias.clone(),
            name: config.display_name.clone(),
            model_id: config.model_id.clone(),
            auth_method: config.auth_method.to_string(),
            api_shape: config.api_shape.to_string(),
            region: config.region.clone(),
            adapter: kind.map(|k| k.as_str().to_string()),
            project_id: config.project_id.clone(),
        }
    }
}

/// Error details without secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
}

impl From<&AuthError> for ErrorOutput {
    fn from(err: &AuthError) -> Self {
        Self {
            code: Some(err.code.to_string()),
            message: err.message.clone(),
            remediation: err.remediation.clone(),
        }
    }
}

impl From<&anyhow::Error> for ErrorOutput {
    fn from(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<AuthError>() {
            Some(auth) => auth.into(),
            None => Self {
                code: None,
                message: err.to_string(),
                remediation: Vec::new(),
            },
        }
    }
}

/// Result of `vtx check`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
    pub alias: String,
    pub auth_method: String,
    pub authenticated: bool,
    pub dependencies: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOutput>,
}

impl CheckOutput {
    /// Builds the output from an auth result. The token itself is never copied.
    pub fn new(config: &ModelAuthConfig, dependencies: bool, auth: &AuthResult) -> Self {
        Self {
            alias: config.alias.clone(),
            auth_method: auth.method.to_string(),
            authenticated: auth.success,
            dependencies,
            expires_at: auth.expires_at,
            error: auth.error.as_ref().map(ErrorOutput::from),
        }
    }
}

/// Result of verifying one model.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOutput {
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOutput>,
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

impl VerifyOutput {
    /// A model that answered.
    pub fn passed(config: &ModelAuthConfig, response: &ChatResponse, elapsed: Duration) -> Self {
        Self {
            alias: config.alias.clone(),
            model_id: Some(config.model_id.clone()),
            ok: true,
            latency_ms: millis(elapsed),
            reply: Some(response.content.trim().to_string()),
            error: None,
        }
    }

    /// A model that failed authentication or the prompt.
    pub fn from_auth_error(config: &ModelAuthConfig, err: AuthError, elapsed: Duration) -> Self {
        Self {
            alias: config.alias.clone(),
            model_id: Some(config.model_id.clone()),
            ok: false,
            latency_ms: millis(elapsed),
            reply: None,
            error: Some((&err).into()),
        }
    }

    /// A model that could not even be resolved.
    pub fn failed(
        alias: &str,
        model_id: Option<&str>,
        err: &anyhow::Error,
        elapsed: Duration,
    ) -> Self {
        Self {
            alias: alias.to_string(),
            model_id: model_id.map(str::to_string),
            ok: false,
            latency_ms: millis(elapsed),
            reply: None,
            error: Some(err.into()),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON output formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
