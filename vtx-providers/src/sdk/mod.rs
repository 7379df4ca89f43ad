//! Python SDK backends driven through an interpreter subprocess.
//!
//! - [`bridge`] - stdin/stdout JSON contract, error mapping, dependency check
//! - [`scripts`] - the programs passed to `python -c`

mod adapter;
pub mod bridge;
pub mod scripts;

pub use adapter::SdkAdapter;
pub use bridge::{SdkBridge, SdkKind, SdkRequest};
