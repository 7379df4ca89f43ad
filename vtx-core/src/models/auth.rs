//! Outcome of an authentication attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::AuthMethod;
use super::token::AccessToken;
use crate::error::AuthError;

/// Result of `authenticate`. Failures are carried in `error`, never raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    /// Whether authentication succeeded.
    pub success: bool,
    /// Method that was attempted.
    pub method: AuthMethod,
    /// Token, when the method produces one.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// When the token expires, if known.
    pub expires_at: Option<DateTime<Utc>>,
    /// Failure details.
    pub error: Option<AuthError>,
}

impl AuthResult {
    /// A successful result carrying a token.
    pub fn with_token(method: AuthMethod, token: &AccessToken) -> Self {
        Self {
            success: true,
            method,
            token: Some(token.token.clone()),
            expires_at: token.expiry_time,
            error: None,
        }
    }

    /// A successful result for methods without a token (SDK bridges).
    pub fn ok(method: AuthMethod) -> Self {
        Self {
            success: true,
            method,
            token: None,
            expires_at: None,
            error: None,
        }
    }

    /// A failed result.
    pub fn failed(method: AuthMethod, error: AuthError) -> Self {
        Self {
            success: false,
            method,
            token: None,
            expires_at: None,
            error: Some(error),
        }
    }

    /// Builds a result from a token lookup.
    pub fn from_token_result(method: AuthMethod, result: Result<AccessToken, AuthError>) -> Self {
        match result {
            Ok(token) => Self::with_token(method, &token),
            Err(err) => Self::failed(method, err),
        }
    }
}
