//! CLI command implementations.

pub mod chat;
pub mod check;
pub mod models;
pub mod verify;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;
use vtx_core::{AuthError, Environment, ModelAdapter, ModelAuthConfig};
use vtx_fetch::FetchContext;
use vtx_providers::AdapterRegistry;
use vtx_store::ModelCatalog;

use crate::Cli;

/// Catalog plus the registry adapters are resolved through.
pub struct Session {
    pub env: Arc<Environment>,
    pub catalog: ModelCatalog,
    pub registry: AdapterRegistry,
}

impl Session {
    /// Loads the catalog named on the command line (or the default one).
    pub fn open(cli: &Cli, env: Environment) -> Result<Self> {
        let catalog = match &cli.models {
            Some(path) => ModelCatalog::load_from(path),
            None => ModelCatalog::load_default(),
        }
        .map_err(AuthError::from)?;

        let ctx = FetchContext::new(env);
        let env = Arc::clone(&ctx.env);
        debug!(models = catalog.len(), "Session ready");
        Ok(Self {
            env,
            catalog,
            registry: AdapterRegistry::new(ctx),
        })
    }

    /// Resolves an alias to its config.
    pub fn config(&self, alias: &str) -> Result<ModelAuthConfig, AuthError> {
        Ok(self.catalog.resolve(alias, &self.env)?)
    }

    /// Resolves an alias to its config and adapter.
    pub fn adapter(&self, alias: &str) -> Result<(ModelAuthConfig, Arc<dyn ModelAdapter>)> {
        let config = self.config(alias)?;
        let adapter = self.registry.resolve(&config)?;
        Ok((config, adapter))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let cleared = self.registry.manager().clear_all();
        if cleared > 0 {
            debug!(cleared, "Cleared cached credentials");
        }
    }
}
