//! Google credential chain.
//!
//! ## Credential Sources
//!
//! Tried in order by [`GoogleTokenSource`]:
//!
//! 1. **`GOOGLE_APPLICATION_CREDENTIALS`**
//!    - `service_account` key → RS256 JWT bearer grant
//!    - `authorized_user` file → refresh-token grant
//!
//! 2. **Application Default Credentials**
//!    - `~/.config/gcloud/application_default_credentials.json`
//!
//! 3. **gcloud CLI**
//!    - `gcloud auth print-access-token`

pub mod adc;
pub mod error;
pub mod gcloud;
pub mod service_account;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use vtx_core::{AccessToken, AuthError};
use vtx_fetch::redact::redact_truncated;
use vtx_fetch::{FetchContext, HttpClient, HttpError, ProcessRunner, TokenRefresher};

pub use adc::{AuthorizedUser, default_adc_path};
pub use error::GoogleAuthError;
pub use service_account::ServiceAccountKey;

/// Google OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Scope requested for every token.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

// ============================================================================
// Credentials File
// ============================================================================

/// Supported credential file formats, discriminated by `type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    /// Service account key.
    ServiceAccount(ServiceAccountKey),
    /// User credentials from `gcloud auth application-default login`.
    AuthorizedUser(AuthorizedUser),
}

impl CredentialsFile {
    /// Reads and parses a credentials file.
    pub fn load(path: &Path) -> Result<Self, GoogleAuthError> {
        let content = std::fs::read_to_string(path).map_err(|source| GoogleAuthError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| GoogleAuthError::InvalidFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceAccount(_) => "service_account",
            Self::AuthorizedUser(_) => "authorized_user",
        }
    }

    /// Project the credentials belong to, if recorded.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(user) => user.quota_project_id.as_deref(),
        }
    }
}

// ============================================================================
// Token Exchange
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Default lifetime when the endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// POSTs an OAuth grant and parses the token response.
pub(crate) async fn exchange(
    http: &HttpClient,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<AccessToken, GoogleAuthError> {
    let response = http.post_form(token_url, form).await?;
    let status = response.status();
    let body = response.text().await.map_err(HttpError::from)?;

    if !status.is_success() {
        return Err(GoogleAuthError::TokenEndpoint {
            status: status.as_u16(),
            body: redact_truncated(body.trim(), 300),
        });
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| GoogleAuthError::InvalidResponse(e.to_string()))?;
    let lifetime = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    debug!(expires_in = lifetime, "Token exchange succeeded");

    Ok(AccessToken::expiring_in(
        token.access_token,
        chrono::Duration::seconds(lifetime),
    ))
}

// ============================================================================
// Token Source
// ============================================================================

/// Walks the credential chain on every refresh.
///
/// Wrapped in a [`vtx_fetch::CredentialCache`] by each bearer-token adapter.
#[derive(Debug, Clone)]
pub struct GoogleTokenSource {
    http: Arc<HttpClient>,
    process: Arc<ProcessRunner>,
    credentials_file: Option<PathBuf>,
    adc_path: Option<PathBuf>,
    token_url: Option<String>,
    use_gcloud: bool,
}

impl GoogleTokenSource {
    /// Creates a source from the context's environment.
    pub fn new(ctx: &FetchContext) -> Self {
        Self {
            http: Arc::clone(&ctx.http),
            process: Arc::clone(&ctx.process),
            credentials_file: ctx.env.credentials_file.clone(),
            adc_path: default_adc_path(),
            token_url: None,
            use_gcloud: true,
        }
    }

    /// Overrides the well-known ADC path. `None` disables it.
    #[must_use]
    pub fn with_adc_path(mut self, path: Option<PathBuf>) -> Self {
        self.adc_path = path;
        self
    }

    /// Sends every grant to `url` instead of the key's token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Enables or disables the gcloud CLI fallback.
    #[must_use]
    pub fn with_gcloud(mut self, enabled: bool) -> Self {
        self.use_gcloud = enabled;
        self
    }

    /// Fetches a token from the first available source.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> Result<AccessToken, GoogleAuthError> {
        if let Some(path) = &self.credentials_file {
            debug!(path = %path.display(), "Using GOOGLE_APPLICATION_CREDENTIALS");
            return self.fetch_from_file(path).await;
        }

        if let Some(path) = self.adc_path.as_deref().filter(|p| p.exists()) {
            debug!(path = %path.display(), "Using application default credentials");
            return self.fetch_from_file(path).await;
        }

        if self.use_gcloud && gcloud::is_available(&self.process) {
            debug!("Falling back to gcloud CLI");
            return gcloud::print_access_token(&self.process).await;
        }

        Err(GoogleAuthError::NoCredentials)
    }

    async fn fetch_from_file(&self, path: &Path) -> Result<AccessToken, GoogleAuthError> {
        let credentials = CredentialsFile::load(path)?;
        debug!(kind = credentials.kind(), "Loaded credentials file");

        match credentials {
            CredentialsFile::ServiceAccount(key) => {
                key.fetch_token(&self.http, self.token_url.as_deref()).await
            }
            CredentialsFile::AuthorizedUser(user) => {
                let url = self.token_url.as_deref().unwrap_or(DEFAULT_TOKEN_URL);
                user.fetch_token(&self.http, url).await
            }
        }
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenSource {
    async fn refresh(&self) -> Result<AccessToken, AuthError> {
        self.fetch().await.map_err(AuthError::from)
    }
}

// ============================================================================
// Tests
// ============================================================================
