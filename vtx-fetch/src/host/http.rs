//! HTTP client with tracing and redacted debug logging.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Bearer or API-key authentication per request
//! - Verbose request logging (debug mode only, always redacted)

use reqwest::{Client, RequestBuilder, Response, header};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::HttpError;
use crate::redact::redact;

/// Default timeout for requests that are read in one piece.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// User agent string for vtx.
const USER_AGENT: &str = concat!("vtx/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Request Auth
// ============================================================================

/// How a request is authenticated.
#[derive(Clone, Copy)]
pub enum RequestAuth<'a> {
    /// `Authorization: Bearer <token>`.
    Bearer(&'a str),
    /// `key=<api key>` query parameter.
    ApiKey(&'a str),
    /// No credentials.
    None,
}

impl RequestAuth<'_> {
    fn apply(self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => builder.bearer_auth(token),
            Self::ApiKey(key) => builder.query(&[("key", key)]),
            Self::None => builder,
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::ApiKey(_) => "api-key",
            Self::None => "none",
        }
    }
}

impl std::fmt::Debug for RequestAuth<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper with tracing and redacted debug logging.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    debug: bool,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built. This only happens when
    /// the TLS backend cannot be initialised, which leaves no way to
    /// reach any backend.
    pub fn new() -> Self {
        Self::try_new().unwrap_or_else(|e| panic!("Failed to create HTTP client: {e}"))
    }

    /// Creates a new HTTP client, reporting builder failures.
    pub fn try_new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner: client,
            debug: false,
        })
    }

    /// Enables verbose request/response logging.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// True if verbose logging is enabled.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// POSTs a JSON body and waits at most [`DEFAULT_TIMEOUT`] for the
    /// complete response.
    #[instrument(skip(self, body), fields(url = %redact(url)))]
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        auth: RequestAuth<'_>,
        body: &T,
    ) -> Result<Response, HttpError> {
        self.send_json(url, auth, body, Some(DEFAULT_TIMEOUT)).await
    }

    /// POSTs a JSON body for a streaming response. No total timeout is
    /// applied so long generations are not cut off.
    #[instrument(skip(self, body), fields(url = %redact(url)))]
    pub async fn post_json_streaming<T: Serialize + ?Sized>(
        &self,
        url: &str,
        auth: RequestAuth<'_>,
        body: &T,
    ) -> Result<Response, HttpError> {
        self.send_json(url, auth, body, None).await
    }

    /// POSTs form data. Used for OAuth token exchanges.
    #[instrument(skip(self, form), fields(url = %url))]
    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        url: &str,
        form: &T,
    ) -> Result<Response, HttpError> {
        let url = parse_url(url)?;
        debug!("POST request with form data");

        let response = self
            .inner
            .post(url)
            .timeout(DEFAULT_TIMEOUT)
            .form(form)
            .send()
            .await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        auth: RequestAuth<'_>,
        body: &T,
        timeout: Option<Duration>,
    ) -> Result<Response, HttpError> {
        let parsed = parse_url(url)?;
        debug!(auth = ?auth, "POST request with JSON");

        if self.debug {
            if let Ok(json) = serde_json::to_string(body) {
                debug!(body = %redact(&json), "Request body");
            }
        }

        let mut request = self.inner.post(parsed).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = auth.apply(request).send().await?;
        debug!(status = %response.status(), "Response received");
        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_url(url: &str) -> Result<Url, HttpError> {
    let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl(format!("{}: {e}", redact(url))))?;
    if parsed.host_str().is_none() {
        return Err(HttpError::InvalidUrl(format!("{}: no host", redact(url))));
    }
    Ok(parsed)
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Get the Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;

    /// The `Content-Type` header, if present and readable.
    fn content_type(&self) -> Option<&str>;
}

impl ResponseExt for Response {
    fn retry_after_secs(&self) -> Option<u64> {
        self.headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    fn content_type(&self) -> Option<&str> {
        self.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

// ============================================================================
// Tests
// ============================================================================
