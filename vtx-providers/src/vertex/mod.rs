//! Gemini models through the native Vertex AI API.
//!
//! Authenticates with a bearer token by default. When `GOOGLE_API_KEY` is
//! set the key goes in the query string and the credential cache is never
//! consulted.

mod adapter;
pub mod parser;

pub use adapter::VertexRestAdapter;
pub use parser::VertexDecoder;
