//! Claude models served through the Vertex AI Anthropic publisher.

mod adapter;
pub mod parser;

pub use adapter::AnthropicRestAdapter;
pub use parser::{ANTHROPIC_VERSION, AnthropicDecoder};
