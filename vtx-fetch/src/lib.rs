// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # vtx Fetch
//!
//! Host APIs and transport plumbing shared by every vtx backend adapter.
//!
//! ## Host APIs
//!
//! - [`host::http`] - HTTP client with tracing and redacted debug logging
//! - [`host::process`] - Subprocess execution with stdin and timeouts
//!
//! ## Transport
//!
//! - [`credential_cache::CredentialCache`] - Per-provider token cache with
//!   refresh-ahead and single-flight refresh
//! - [`response`] - HTTP status and body classification
//! - [`sse`] - Incremental Server-Sent-Events parsing
//! - [`redact`] - Secret masking for log output
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vtx_fetch::{CredentialCache, RefreshFn};
//!
//! let cache = CredentialCache::new("google", Arc::new(RefreshFn(|| async {
//!     fetch_token().await
//! })));
//! let token = cache.get_token().await?;
//! ```

pub mod context;
pub mod credential_cache;
pub mod error;
pub mod host;
pub mod redact;
pub mod response;
pub mod retry;
pub mod sse;

// Errors
pub use error::{HttpError, ProcessError};

// Host APIs
pub use host::{
    http::{HttpClient, RequestAuth, ResponseExt},
    process::{ProcessOutput, ProcessRunner},
};

// Transport
pub use context::{FetchContext, FetchContextBuilder};
pub use credential_cache::{CredentialCache, CredentialCacheBuilder, RefreshFn, TokenRefresher};
pub use response::RequestContext;
pub use retry::RetryStrategy;
pub use sse::{Decoded, EventDecoder, SseParser};
