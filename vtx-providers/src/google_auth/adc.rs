//! Application Default Credentials (`authorized_user`).
//!
//! Written by `gcloud auth application-default login`. Holds a long-lived
//! refresh token that is exchanged for access tokens at the OAuth endpoint.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, instrument};
use vtx_core::AccessToken;
use vtx_fetch::HttpClient;

use super::error::GoogleAuthError;
use super::exchange;

/// Well-known ADC location for the current user.
pub fn default_adc_path() -> Option<PathBuf> {
    #[cfg(windows)]
    let base = dirs::config_dir();
    #[cfg(not(windows))]
    let base = dirs::home_dir().map(|home| home.join(".config"));

    base.map(|dir| {
        dir.join("gcloud")
            .join("application_default_credentials.json")
    })
}

/// An `authorized_user` credentials file.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: String,
    /// Quota project for billing.
    #[serde(default)]
    pub quota_project_id: Option<String>,
}

impl std::fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("quota_project_id", &self.quota_project_id)
            .finish_non_exhaustive()
    }
}

impl AuthorizedUser {
    /// Exchanges the refresh token for an access token.
    #[instrument(skip(self, http))]
    pub async fn fetch_token(
        &self,
        http: &HttpClient,
        token_url: &str,
    ) -> Result<AccessToken, GoogleAuthError> {
        info!("Refreshing ADC access token");
        exchange(
            http,
            token_url,
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path() {
        let path = default_adc_path().unwrap();
        assert!(path.ends_with("gcloud/application_default_credentials.json"));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let user = AuthorizedUser {
            client_id: "123.apps.googleusercontent.com".into(),
            client_secret: "shh".into(),
            refresh_token: "1//refresh".into(),
            quota_project_id: None,
        };
        let out = format!("{user:?}");
        assert!(!out.contains("shh"));
        assert!(!out.contains("1//refresh"));
    }
}
