// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # vtx Providers
//!
//! Backend adapters for models hosted on Vertex AI.
//!
//! ## Adapters
//!
//! | Adapter | Auth | Endpoint | Streaming |
//! |---------|------|----------|-----------|
//! | [`OpenApiAdapter`] | Bearer | `endpoints/openapi/chat/completions` | ✅ |
//! | [`VertexRestAdapter`] | Bearer or API key | `publishers/google/…:generateContent` | ✅ |
//! | [`AnthropicRestAdapter`] | Bearer | `publishers/anthropic/…:rawPredict` | ✅ |
//! | [`SdkAdapter`] (anthropic) | SDK | `python -c` subprocess | ❌ |
//! | [`SdkAdapter`] (vertex) | SDK | `python -c` subprocess | ❌ |
//!
//! ## Usage
//!
//! ```ignore
//! use vtx_core::{ChatRequest, Environment};
//! use vtx_fetch::FetchContext;
//! use vtx_providers::AdapterRegistry;
//!
//! let registry = AdapterRegistry::new(FetchContext::new(Environment::from_process()));
//! let adapter = registry.resolve(&config)?;
//! let response = adapter.send_request(&ChatRequest::prompt("Hello", 256)).await?;
//! ```

pub mod anthropic;
pub mod endpoint;
pub mod google_auth;
pub mod manager;
pub mod openapi;
pub mod registry;
pub mod sdk;
pub mod vertex;

mod rest;

pub use anthropic::AnthropicRestAdapter;
pub use google_auth::{GoogleAuthError, GoogleTokenSource};
pub use manager::CredentialManager;
pub use openapi::OpenApiAdapter;
pub use registry::{AdapterKind, AdapterRegistry};
pub use sdk::{SdkAdapter, SdkKind};
pub use vertex::VertexRestAdapter;
