//! Google credential errors.

use std::path::PathBuf;

use thiserror::Error;
use vtx_core::AuthError;
use vtx_fetch::{HttpError, ProcessError};

/// Errors raised while obtaining a Google access token.
#[derive(Debug, Error)]
pub enum GoogleAuthError {
    /// No credential source is available.
    #[error("No Google credentials found")]
    NoCredentials,

    /// A credentials file could not be read.
    #[error("Failed to read credentials file {path}: {source}")]
    ReadFile {
        /// File that was read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A credentials file has an unsupported or broken format.
    #[error("Invalid credentials file {path}: {reason}")]
    InvalidFile {
        /// File that was parsed.
        path: PathBuf,
        /// Parse failure.
        reason: String,
    },

    /// The service account private key could not be loaded.
    #[error("Invalid service account private key: {0}")]
    InvalidKey(String),

    /// Signing the JWT assertion failed.
    #[error("Failed to sign JWT assertion")]
    Signing,

    /// The OAuth token endpoint rejected the exchange.
    #[error("Token endpoint returned {status}: {body}")]
    TokenEndpoint {
        /// HTTP status.
        status: u16,
        /// Truncated, redacted response body.
        body: String,
    },

    /// The token endpoint answered with something unparseable.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Transport failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// `gcloud` failed or is missing.
    #[error("gcloud failed: {0}")]
    Gcloud(#[from] ProcessError),

    /// `gcloud` printed nothing.
    #[error("gcloud returned an empty token")]
    EmptyToken,
}

const LOGIN_STEP: &str = "Run `gcloud auth application-default login`";

impl From<GoogleAuthError> for AuthError {
    fn from(err: GoogleAuthError) -> Self {
        let message = err.to_string();
        match err {
            GoogleAuthError::NoCredentials => AuthError::missing_credentials(message).with_steps([
                LOGIN_STEP,
                "Or set GOOGLE_APPLICATION_CREDENTIALS to a service account key file",
            ]),
            GoogleAuthError::ReadFile { .. }
            | GoogleAuthError::InvalidFile { .. }
            | GoogleAuthError::InvalidKey(_)
            | GoogleAuthError::Signing => AuthError::invalid_credentials(message)
                .with_step("Check the file GOOGLE_APPLICATION_CREDENTIALS points at"),
            GoogleAuthError::TokenEndpoint { status, .. } if (400..500).contains(&status) => {
                AuthError::invalid_credentials(message).with_step(LOGIN_STEP)
            }
            GoogleAuthError::TokenEndpoint { .. } | GoogleAuthError::InvalidResponse(_) => {
                AuthError::network(message)
            }
            GoogleAuthError::Http(e) => e.into(),
            GoogleAuthError::Gcloud(e) if e.is_spawn_failure() => {
                AuthError::missing_dependency("gcloud", message)
                    .with_step("Install the Google Cloud SDK: https://cloud.google.com/sdk/docs/install")
            }
            GoogleAuthError::Gcloud(ProcessError::Timeout(_)) => AuthError::network(message),
            GoogleAuthError::Gcloud(_) | GoogleAuthError::EmptyToken => {
                AuthError::invalid_credentials(message).with_step("Run `gcloud auth login`")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtx_core::AuthErrorCode;

    #[test]
    fn test_no_credentials_remediation() {
        let err: AuthError = GoogleAuthError::NoCredentials.into();
        assert_eq!(err.code, AuthErrorCode::MissingCredentials);
        assert_eq!(err.remediation[0], LOGIN_STEP);
    }

    #[test]
    fn test_token_endpoint_mapping() {
        let err: AuthError = GoogleAuthError::TokenEndpoint {
            status: 400,
            body: "invalid_grant".to_string(),
        }
        .into();
        assert_eq!(err.code, AuthErrorCode::InvalidCredentials);

        let err: AuthError = GoogleAuthError::TokenEndpoint {
            status: 503,
            body: String::new(),
        }
        .into();
        assert_eq!(err.code, AuthErrorCode::NetworkError);
    }

    #[test]
    fn test_missing_gcloud() {
        let err: AuthError = GoogleAuthError::Gcloud(ProcessError::NotFound("gcloud".into())).into();
        assert_eq!(err.code, AuthErrorCode::MissingDependency);
        assert_eq!(err.dependency.as_deref(), Some("gcloud"));
    }
}
