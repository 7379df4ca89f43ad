//! Response classification.
//!
//! Maps HTTP failures onto the [`AuthError`] taxonomy and validates that a
//! successful body is really JSON before it is parsed. Gateways in front of
//! Vertex AI sometimes answer `200 OK` with an HTML login or error page.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use vtx_core::AuthError;

use crate::error::HttpError;
use crate::host::http::ResponseExt;
use crate::redact::{redact, redact_truncated};

/// Error bodies are cut to this many characters before they reach a message.
pub const MAX_ERROR_BODY_CHARS: usize = 500;

static RETRY_IN_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry[^0-9]{0,40}?(\d+)(?:\.\d+)?\s*(?:s\b|secs?\b|seconds?\b)")
        .expect("retry pattern is valid")
});

/// What was being called, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Endpoint URL (redacted before use).
    pub endpoint: &'a str,
    /// Wire-level model identifier.
    pub model_id: &'a str,
}

/// True if `body` starts like an HTML document.
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(16).collect::<String>().to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Extracts a "retry in N seconds" hint from an error body.
pub fn retry_after_from_body(body: &str) -> Option<u64> {
    RETRY_IN_BODY
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Maps a non-2xx status and its body to an [`AuthError`].
pub fn error_for_status(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
    ctx: RequestContext<'_>,
) -> AuthError {
    let html = looks_like_html(body);
    let detail = if html {
        "(HTML error page)".to_string()
    } else {
        redact_truncated(body.trim(), MAX_ERROR_BODY_CHARS)
    };

    match status {
        StatusCode::UNAUTHORIZED => AuthError::invalid_credentials(format!(
            "Authentication failed (401): {detail}"
        ))
        .with_steps([
            "Run `gcloud auth application-default login` to refresh your credentials",
            "Check that GOOGLE_APPLICATION_CREDENTIALS points at a valid key file",
        ]),
        StatusCode::FORBIDDEN => AuthError::invalid_credentials(format!(
            "Permission denied (403): {detail}"
        ))
        .with_steps([
            "Grant the account the Vertex AI User role (roles/aiplatform.user)",
            "Enable the model for your project in Model Garden",
        ]),
        // Proxies and wrong hosts answer with HTML; the status is not the
        // backend's verdict on the endpoint.
        _ if html && status != StatusCode::TOO_MANY_REQUESTS => AuthError::network(format!(
            "Endpoint returned an HTML error page (HTTP {}) instead of JSON",
            status.as_u16()
        ))
        .with_step("Check the endpoint host and any proxy configuration"),
        StatusCode::NOT_FOUND => AuthError::invalid_config(format!(
            "Endpoint not found (404): {} for model {}",
            redact(ctx.endpoint),
            ctx.model_id
        ))
        .with_steps([
            "Check the model id and region in your models.yaml",
            "Confirm the model is available in that region",
        ]),
        StatusCode::TOO_MANY_REQUESTS => {
            let wait = retry_after.or_else(|| retry_after_from_body(body));
            let mut message = match wait {
                Some(secs) => format!("Rate limited (429). Retry after {secs} seconds"),
                None => "Rate limited (429). Retry later".to_string(),
            };
            if html {
                message.push_str(" (HTML error page)");
            }
            AuthError::network(message).with_step("Reduce request rate or request a quota increase")
        }
        _ => AuthError::network(format!("HTTP {}: {detail}", status.as_u16())),
    }
}

/// Passes 2xx responses through and turns anything else into an error,
/// consuming the body.
pub async fn check_status(response: Response, ctx: RequestContext<'_>) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response.retry_after_secs();
    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, model = ctx.model_id, "Backend returned an error");
    Err(error_for_status(status, retry_after, &body, ctx))
}

/// Checks the status, then reads the body once and parses it as JSON.
///
/// HTML bodies and non-JSON content types are rejected before parsing.
pub async fn read_json(
    response: Response,
    ctx: RequestContext<'_>,
    debug_bodies: bool,
) -> Result<Value, AuthError> {
    let response = check_status(response, ctx).await?;
    let content_type = response.content_type().map(str::to_ascii_lowercase);
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::from(HttpError::from(e)))?;

    if debug_bodies {
        debug!(body = %redact(&body), "Response body");
    }

    parse_json_body(&body, content_type.as_deref())
}

/// Validates and parses a successful response body.
pub fn parse_json_body(body: &str, content_type: Option<&str>) -> Result<Value, AuthError> {
    if looks_like_html(body) {
        return Err(AuthError::network(
            "Received an HTML error page instead of JSON; the endpoint or a proxy rejected the request",
        )
        .with_step("Check the endpoint host and any proxy configuration"));
    }

    if let Some(ct) = content_type {
        if !ct.contains("json") {
            return Err(AuthError::network(format!(
                "Unexpected content type {ct}: {}",
                redact_truncated(body.trim(), MAX_ERROR_BODY_CHARS)
            )));
        }
    }

    serde_json::from_str(body).map_err(|e| {
        AuthError::network(format!(
            "Invalid JSON response ({e}): {}",
            redact_truncated(body.trim(), MAX_ERROR_BODY_CHARS)
        ))
    })
}
