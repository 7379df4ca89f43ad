//! Interpreter subprocess bridge.
//!
//! One process per request: the request goes to stdin as JSON, the result
//! comes back as one JSON document on stdout (or stderr on failure). Both
//! pipes are drained before the exit status is trusted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use vtx_core::{AuthError, ChatRequest, ChatResponse, Role, Usage};
use vtx_fetch::redact::redact_truncated;
use vtx_fetch::{ProcessOutput, ProcessRunner};

use super::scripts::{ANTHROPIC_SCRIPT, VERTEX_SCRIPT};

/// Per-request timeout for the interpreter.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Dependency checks slower than this are logged.
pub const SLOW_VALIDATION: Duration = Duration::from_secs(10);

const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_STDERR_CHARS: usize = 500;

/// Which Python SDK a bridge drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkKind {
    /// `anthropic[vertex]`.
    Anthropic,
    /// `google-cloud-aiplatform`.
    Vertex,
}

impl SdkKind {
    /// Module imported by the dependency check.
    pub fn module(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Vertex => "vertexai",
        }
    }

    /// Package to install when the module is missing.
    pub fn package(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic[vertex]",
            Self::Vertex => "google-cloud-aiplatform",
        }
    }

    fn script(self) -> &'static str {
        match self {
            Self::Anthropic => ANTHROPIC_SCRIPT,
            Self::Vertex => VERTEX_SCRIPT,
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// One message on the stdin contract.
#[derive(Debug, Serialize)]
pub struct SdkMessage<'a> {
    /// `system`, `user` or `assistant`.
    pub role: &'static str,
    /// Message text.
    pub content: &'a str,
}

/// Request written to the interpreter's stdin.
#[derive(Debug, Serialize)]
pub struct SdkRequest<'a> {
    /// Conversation, system text first.
    pub messages: Vec<SdkMessage<'a>>,
    /// Output token limit.
    pub max_tokens: u32,
    /// Always false; the scripts return one document.
    pub stream: bool,
    /// Wire-level model id.
    pub model: &'a str,
    /// Google Cloud project.
    pub project_id: Option<&'a str>,
    /// Vertex AI region.
    pub region: &'a str,
}

impl<'a> SdkRequest<'a> {
    /// Builds the stdin payload for `request`.
    pub fn new(
        request: &'a ChatRequest,
        system: Option<&'a str>,
        model: &'a str,
        project_id: Option<&'a str>,
        region: &'a str,
    ) -> Self {
        let messages = system
            .map(|content| SdkMessage {
                role: Role::System.as_str(),
                content,
            })
            .into_iter()
            .chain(request.conversation().map(|m| SdkMessage {
                role: m.role.as_str(),
                content: &m.content,
            }))
            .collect();

        Self {
            messages,
            max_tokens: request.max_tokens,
            stream: false,
            model,
            project_id,
            region,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SdkOutput {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

// ============================================================================
// Bridge
// ============================================================================

/// Runs one SDK script through an interpreter.
#[derive(Debug, Clone)]
pub struct SdkBridge {
    process: Arc<ProcessRunner>,
    python: String,
    kind: SdkKind,
    script: &'static str,
    timeout: Duration,
}

impl SdkBridge {
    /// Creates a bridge for `kind` using interpreter `python`.
    pub fn new(process: Arc<ProcessRunner>, python: impl Into<String>, kind: SdkKind) -> Self {
        Self {
            process,
            python: python.into(),
            kind,
            script: kind.script(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    /// Replaces the program passed to `-c`.
    #[must_use]
    pub fn with_script(mut self, script: &'static str) -> Self {
        self.script = script;
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Interpreter path.
    pub fn python(&self) -> &str {
        &self.python
    }

    /// SDK this bridge drives.
    pub fn kind(&self) -> SdkKind {
        self.kind
    }

    /// Sends `request` through the script and parses its answer.
    #[instrument(skip(self, request), fields(python = %self.python, sdk = self.kind.module()))]
    pub async fn invoke(&self, request: &SdkRequest<'_>) -> Result<ChatResponse, AuthError> {
        let input = serde_json::to_vec(request)?;
        let output = self
            .process
            .run_with_stdin(&self.python, &["-c", self.script], &input, self.timeout)
            .await
            .map_err(|e| {
                let spawn = e.is_spawn_failure();
                let err = AuthError::from(e);
                if spawn {
                    err.with_step(format!(
                        "Install Python 3 or point VTX_PYTHON_PATH at an interpreter (tried {})",
                        self.python
                    ))
                } else {
                    err
                }
            })?;

        debug!(
            exit_code = output.exit_code,
            duration_ms = output.duration.as_millis(),
            "SDK script finished"
        );
        self.parse_output(&output)
    }

    /// Interprets a finished script run.
    pub fn parse_output(&self, output: &ProcessOutput) -> Result<ChatResponse, AuthError> {
        if !output.success() {
            return Err(match parse_document(&output.stderr) {
                Some(SdkOutput {
                    error: Some(message),
                    error_type,
                    ..
                }) => self.classify(error_type.as_deref(), message),
                _ => AuthError::network(format!(
                    "SDK script exited with code {}: {}",
                    output.exit_code,
                    redact_truncated(output.stderr.trim(), MAX_STDERR_CHARS)
                )),
            });
        }

        let document = parse_document(&output.stdout).ok_or_else(|| {
            AuthError::network(format!(
                "SDK script produced no JSON output: {}",
                redact_truncated(output.stdout.trim(), MAX_STDERR_CHARS)
            ))
        })?;

        if let Some(message) = document.error {
            return Err(self.classify(document.error_type.as_deref(), message));
        }

        Ok(ChatResponse {
            content: document.content.unwrap_or_default(),
            stop_reason: document.stop_reason,
            model: document.model,
            usage: document.usage,
        })
    }

    fn classify(&self, error_type: Option<&str>, message: String) -> AuthError {
        let error_type = error_type.unwrap_or("Error");
        let message = redact_truncated(&message, MAX_STDERR_CHARS);
        match error_type {
            "ImportError" | "ModuleNotFoundError" => AuthError::missing_dependency(
                self.kind.module(),
                format!("Python SDK not importable: {message}"),
            )
            .with_step(format!(
                "{} -m pip install '{}'",
                self.python,
                self.kind.package()
            )),
            t if is_auth_error(t) => AuthError::invalid_credentials(format!("{t}: {message}"))
                .with_step("Run `gcloud auth application-default login`"),
            t => AuthError::network(format!("{t}: {message}")),
        }
    }

    /// Checks the interpreter runs and the SDK module imports.
    #[instrument(skip(self), fields(python = %self.python, sdk = self.kind.module()))]
    pub async fn validate(&self) -> bool {
        let start = Instant::now();
        let ok = self.check_interpreter().await;
        let elapsed = start.elapsed();
        if elapsed > SLOW_VALIDATION {
            warn!(elapsed_ms = elapsed.as_millis(), "Slow SDK dependency check");
        }
        ok
    }

    async fn check_interpreter(&self) -> bool {
        let version = self
            .process
            .run_with_timeout(&self.python, &["--version"], CHECK_TIMEOUT)
            .await;
        match version {
            Ok(output) if output.success() => {}
            Ok(output) => {
                debug!(exit_code = output.exit_code, "Interpreter version check failed");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Interpreter not runnable");
                return false;
            }
        }

        let import = format!("import {}", self.kind.module());
        match self
            .process
            .run_with_timeout(&self.python, &["-c", import.as_str()], CHECK_TIMEOUT)
            .await
        {
            Ok(output) => output.success(),
            Err(e) => {
                debug!(error = %e, "Import check failed");
                false
            }
        }
    }
}

/// Parses the whole text as JSON, falling back to its last line so that
/// SDK warnings printed before the result are tolerated.
fn parse_document(text: &str) -> Option<SdkOutput> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok().or_else(|| {
        trimmed
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('{'))
            .and_then(|line| serde_json::from_str(line).ok())
    })
}

fn is_auth_error(error_type: &str) -> bool {
    let lower = error_type.to_ascii_lowercase();
    ["auth", "credential", "permission", "forbidden", "refresherror"]
        .iter()
        .any(|needle| lower.contains(needle))
}
