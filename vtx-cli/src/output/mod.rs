//! Output formatting for CLI.

mod json;
mod text;

pub use json::{CheckOutput, JsonFormatter, ModelOutput, VerifyOutput};
pub use text::TextFormatter;
