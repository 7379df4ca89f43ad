//! Domain models for vtx.
//!
//! ## Submodules
//!
//! - [`token`] - Access tokens and cached-token validity math
//! - [`config`] - Resolved model configuration (auth method, API shape, family)
//! - [`auth`] - Authentication outcomes
//! - [`chat`] - Backend-neutral chat request/response types
//! - [`environment`] - Injected environment snapshot

mod auth;
mod chat;
mod config;
mod environment;
mod token;

pub use auth::AuthResult;
pub use chat::{ChatMessage, ChatRequest, ChatResponse, Role, StreamChunk, Usage};
pub use config::{
    ApiShape, AuthMethod, DEFAULT_MAX_TOKENS, DEFAULT_REGION, ModelAuthConfig, ModelFamily,
};
pub use environment::{
    DEFAULT_PYTHON, Environment, GOOGLE_API_KEY, GOOGLE_APPLICATION_CREDENTIALS,
    GOOGLE_CLOUD_PROJECT, VTX_DEBUG, VTX_PYTHON_PATH,
};
pub use token::{AccessToken, CachedToken, DEFAULT_GRACE_PERIOD, DEFAULT_REFRESH_BUFFER};
