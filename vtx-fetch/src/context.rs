//! Fetch context providing access to host APIs.
//!
//! The context is handed to every adapter and gives unified access to the
//! HTTP client, the process runner, and the injected [`Environment`].

use std::sync::Arc;

use vtx_core::Environment;

use crate::host::{http::HttpClient, process::ProcessRunner};

// ============================================================================
// Fetch Context
// ============================================================================

/// Host APIs shared by all adapters.
#[derive(Clone)]
pub struct FetchContext {
    /// HTTP client with tracing.
    pub http: Arc<HttpClient>,
    /// Process runner for CLI tools and interpreters.
    pub process: Arc<ProcessRunner>,
    /// Environment snapshot.
    pub env: Arc<Environment>,
}

impl FetchContext {
    /// Creates a context for `env` with default host API implementations.
    pub fn new(env: Environment) -> Self {
        Self::builder().env(env).build()
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> FetchContextBuilder {
        FetchContextBuilder::new()
    }

    /// True if verbose request/response logging is on.
    pub fn debug(&self) -> bool {
        self.env.debug
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Fetch Context Builder
// ============================================================================

/// Builder for constructing a `FetchContext`.
#[derive(Default)]
pub struct FetchContextBuilder {
    http: Option<Arc<HttpClient>>,
    process: Option<Arc<ProcessRunner>>,
    env: Environment,
}

impl FetchContextBuilder {
    /// Creates a new builder with an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP client.
    #[must_use]
    pub fn http(mut self, http: Arc<HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// Sets the process runner.
    #[must_use]
    pub fn process(mut self, process: Arc<ProcessRunner>) -> Self {
        self.process = Some(process);
        self
    }

    /// Sets the environment snapshot.
    #[must_use]
    pub fn env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Builds the fetch context. Without an explicit HTTP client, one is
    /// created with debug logging following the environment.
    pub fn build(self) -> FetchContext {
        let debug = self.env.debug;
        FetchContext {
            http: self
                .http
                .unwrap_or_else(|| Arc::new(HttpClient::new().with_debug(debug))),
            process: self.process.unwrap_or_default(),
            env: Arc::new(self.env),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
