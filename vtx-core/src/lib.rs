// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # vtx Core
//!
//! Core types, errors, and traits shared by every vtx crate.
//!
//! ## Key Types
//!
//! ### Credentials
//! - [`AccessToken`] - Bearer token with optional expiry
//! - [`CachedToken`] - Token with refresh-ahead and grace-period math
//! - [`AuthResult`] - Outcome of an authentication attempt
//!
//! ### Configuration
//! - [`ModelAuthConfig`] - Resolved configuration for one model alias
//! - [`AuthMethod`], [`ApiShape`], [`ModelFamily`] - Dispatch tags
//! - [`Environment`] - Injected environment snapshot
//!
//! ### Requests
//! - [`ChatRequest`], [`ChatResponse`], [`StreamChunk`]
//!
//! ### Errors & Traits
//! - [`AuthError`] / [`AuthErrorCode`] - The error taxonomy
//! - [`ModelAdapter`] - The adapter contract

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::{AuthError, AuthErrorCode};

// Re-export all model types
pub use models::{
    // Credentials
    AccessToken,
    AuthResult,
    CachedToken,
    DEFAULT_GRACE_PERIOD,
    DEFAULT_REFRESH_BUFFER,
    // Configuration
    ApiShape,
    AuthMethod,
    DEFAULT_MAX_TOKENS,
    DEFAULT_REGION,
    // Environment
    DEFAULT_PYTHON,
    Environment,
    GOOGLE_API_KEY,
    GOOGLE_APPLICATION_CREDENTIALS,
    GOOGLE_CLOUD_PROJECT,
    VTX_DEBUG,
    VTX_PYTHON_PATH,
    ModelAuthConfig,
    ModelFamily,
    // Requests
    ChatMessage,
    ChatRequest,
    ChatResponse,
    Role,
    StreamChunk,
    Usage,
};

// Re-export traits
pub use traits::{ModelAdapter, ResponseStream};
