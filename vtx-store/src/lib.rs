// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # vtx Store
//!
//! Loads the `models.yaml` catalog and resolves aliases into
//! [`vtx_core::ModelAuthConfig`] values.
//!
//! ## Usage
//!
//! ```ignore
//! use vtx_core::Environment;
//! use vtx_store::ModelCatalog;
//!
//! let catalog = ModelCatalog::load_default()?;
//! let config = catalog.resolve("gemini-flash", &Environment::from_process())?;
//! ```

pub mod catalog;
pub mod error;

pub use catalog::{CATALOG_FILE, ModelCatalog, VTX_MODELS};
pub use error::StoreError;
