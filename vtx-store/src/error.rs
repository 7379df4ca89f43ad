//! Store error types.

use std::path::PathBuf;

use thiserror::Error;
use vtx_core::AuthError;

/// Errors that can occur while loading the model catalog.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Catalog file does not exist.
    #[error("Model catalog not found at {0}")]
    NotFound(PathBuf),

    /// IO error.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// YAML syntax or shape error.
    #[error("Invalid model catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An entry has an invalid value.
    #[error("Invalid entry '{alias}': {reason}")]
    InvalidEntry {
        /// Alias of the entry.
        alias: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Alias is not in the catalog.
    #[error("Unknown model alias '{alias}'")]
    UnknownAlias {
        /// Alias that was requested.
        alias: String,
        /// Aliases the catalog does define.
        available: Vec<String>,
    },
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound(path) => AuthError::invalid_config(message).with_steps([
                format!("Create {} with your model definitions", path.display()),
                "Or pass --models / set VTX_MODELS to another file".to_string(),
            ]),
            StoreError::UnknownAlias { available, .. } if available.is_empty() => {
                AuthError::invalid_config(message).with_step("The catalog defines no models")
            }
            StoreError::UnknownAlias { available, .. } => AuthError::invalid_config(message)
                .with_step(format!("Available models: {}", available.join(", "))),
            StoreError::Io { .. } | StoreError::Yaml(_) | StoreError::InvalidEntry { .. } => {
                AuthError::invalid_config(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtx_core::AuthErrorCode;

    #[test]
    fn test_unknown_alias_lists_available() {
        let err: AuthError = StoreError::UnknownAlias {
            alias: "gpt".into(),
            available: vec!["flash".into(), "sonnet".into()],
        }
        .into();
        assert_eq!(err.code, AuthErrorCode::InvalidConfig);
        assert!(err.message.contains("gpt"));
        assert_eq!(err.remediation, vec!["Available models: flash, sonnet".to_string()]);
    }
}
