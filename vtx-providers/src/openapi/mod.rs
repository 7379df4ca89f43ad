//! Vertex AI OpenAPI chat-completions backend.
//!
//! Bearer-token authenticated. The model id travels in the request body,
//! the URL only names the project and region.

mod adapter;
pub mod parser;

pub use adapter::OpenApiAdapter;
pub use parser::ChatCompletionsDecoder;
