//! Fetch error types.
//!
//! Host-level errors stay specific ([`HttpError`], [`ProcessError`]) inside
//! this crate and are folded into the [`AuthError`] taxonomy at the boundary.

use std::time::Duration;
use thiserror::Error;
use vtx_core::AuthError;

// ============================================================================
// HTTP Error
// ============================================================================

/// HTTP-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Timeout.
    #[error("Request timed out")]
    Timeout,
}

impl From<HttpError> for AuthError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Request(e) if e.is_timeout() => {
                AuthError::network(format!("Request timed out: {e}"))
            }
            HttpError::Request(e) if e.is_connect() => {
                AuthError::network(format!("Connection failed: {e}"))
                    .with_step("Check your network connection and proxy settings")
            }
            HttpError::Request(e) => AuthError::network(format!("HTTP request failed: {e}")),
            HttpError::InvalidUrl(url) => AuthError::invalid_config(format!("Invalid URL: {url}")),
            HttpError::Timeout => AuthError::network("Request timed out"),
        }
    }
}

// ============================================================================
// Process Error
// ============================================================================

/// Error type for process operations.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Command not found.
    #[error("Command not found: {0}")]
    NotFound(String),

    /// Command could not be started.
    #[error("Failed to spawn {cmd}: {source}")]
    SpawnFailed {
        /// Command that failed to start.
        cmd: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Command timed out.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Non-zero exit code.
    #[error("Command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code from the process.
        code: i32,
        /// Standard error output.
        stderr: String,
    },

    /// IO error while talking to the child.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessError {
    /// True if the process never started (tool missing or not executable).
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::SpawnFailed { .. })
    }
}

impl From<ProcessError> for AuthError {
    fn from(err: ProcessError) -> Self {
        match &err {
            ProcessError::NotFound(cmd) | ProcessError::SpawnFailed { cmd, .. } => {
                AuthError::missing_dependency(cmd.clone(), err.to_string())
            }
            ProcessError::Timeout(_) | ProcessError::NonZeroExit { .. } | ProcessError::Io(_) => {
                AuthError::network(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtx_core::AuthErrorCode;

    #[test]
    fn test_spawn_failures_are_dependency_errors() {
        let err: AuthError = ProcessError::NotFound("python3".to_string()).into();
        assert_eq!(err.code, AuthErrorCode::MissingDependency);
        assert_eq!(err.dependency.as_deref(), Some("python3"));

        let spawn = ProcessError::SpawnFailed {
            cmd: "python3".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(spawn.is_spawn_failure());
        let err: AuthError = spawn.into();
        assert_eq!(err.code, AuthErrorCode::MissingDependency);
    }

    #[test]
    fn test_timeout_is_network_error() {
        let err: AuthError = ProcessError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(err.code, AuthErrorCode::NetworkError);
        assert!(err.message.contains("timed out"));
    }
}
