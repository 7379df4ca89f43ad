//! Authentication and request error types for vtx.
//!
//! Every failure that leaves this workspace is an [`AuthError`]. Callers
//! branch on [`AuthError::code`] to tell "tool not installed" apart from
//! "tool ran and failed" and from "remote API rejected the request".

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Code
// ============================================================================

/// Category of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    /// No credentials could be found.
    MissingCredentials,
    /// Credentials were found but rejected or expired.
    InvalidCredentials,
    /// An external tool or package is not installed.
    MissingDependency,
    /// A required environment variable is unset.
    MissingEnvVar,
    /// The declarative model configuration is unusable.
    InvalidConfig,
    /// Transport failure or a non-success response from the remote API.
    NetworkError,
}

impl AuthErrorCode {
    /// Returns the wire-style name of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::MissingDependency => "MISSING_DEPENDENCY",
            Self::MissingEnvVar => "MISSING_ENV_VAR",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::NetworkError => "NETWORK_ERROR",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Auth Error
// ============================================================================

/// Typed error carried by every adapter operation.
///
/// The error is `Clone` so that a single refresh failure can be handed to
/// every caller waiting on the same in-flight refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct AuthError {
    /// Error category.
    pub code: AuthErrorCode,
    /// Human readable message.
    pub message: String,
    /// Ordered remediation steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
    /// Name of the missing external dependency, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    /// Name of the missing environment variable, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_var: Option<String>,
}

impl AuthError {
    /// Creates an error with the given code and message.
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            remediation: Vec::new(),
            dependency: None,
            env_var: None,
        }
    }

    /// No credentials could be located.
    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::MissingCredentials, message)
    }

    /// Credentials were rejected or have expired.
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidCredentials, message)
    }

    /// An external dependency is missing.
    pub fn missing_dependency(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new(AuthErrorCode::MissingDependency, message);
        err.dependency = Some(dependency.into());
        err
    }

    /// A required environment variable is unset.
    pub fn missing_env_var(var: impl Into<String>) -> Self {
        let var = var.into();
        let mut err = Self::new(
            AuthErrorCode::MissingEnvVar,
            format!("Required environment variable {var} is not set"),
        );
        err.remediation.push(format!("export {var}=<value>"));
        err.env_var = Some(var);
        err
    }

    /// The model configuration is invalid.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidConfig, message)
    }

    /// Network or remote API failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::NetworkError, message)
    }

    /// Appends one remediation step.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.remediation.push(step.into());
        self
    }

    /// Appends several remediation steps, preserving order.
    #[must_use]
    pub fn with_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remediation.extend(steps.into_iter().map(Into::into));
        self
    }

    /// Returns true if this error has the given code.
    pub fn is(&self, code: AuthErrorCode) -> bool {
        self.code == code
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::network(format!("Failed to parse JSON: {err}"))
    }
}

// ============================================================================
// Tests
// ============================================================================
