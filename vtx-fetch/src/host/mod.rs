//! Host APIs for talking to backends.
//!
//! - [`http`] - HTTP client with tracing and redacted debug logging
//! - [`process`] - Subprocess execution with stdin and timeouts

pub mod http;
pub mod process;

pub use http::{HttpClient, RequestAuth, ResponseExt};
pub use process::{ProcessOutput, ProcessRunner};
