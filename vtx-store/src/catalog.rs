//! The `models.yaml` catalog.
//!
//! Each top-level key is a model alias:
//!
//! ```yaml
//! gemini-flash:
//!   name: Gemini 2.5 Flash
//!   endpoint_id: gemini-2.5-flash
//!   auth_method: bearer-token
//!   api_shape: vertex-native
//!   region: us-central1
//! ```
//!
//! Every entry is validated when the file is loaded, so a bad value is
//! reported even for aliases that are never used.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use vtx_core::{
    ApiShape, AuthMethod, DEFAULT_MAX_TOKENS, DEFAULT_REGION, Environment, ModelAuthConfig,
    ModelFamily,
};

use crate::error::StoreError;

/// Environment variable overriding the catalog location.
pub const VTX_MODELS: &str = "VTX_MODELS";

/// Catalog file name inside the config directory.
pub const CATALOG_FILE: &str = "models.yaml";

/// One entry as written in the file.
#[derive(Debug, Deserialize)]
struct RawEntry {
    name: Option<String>,
    endpoint_id: String,
    auth_method: Option<String>,
    api_shape: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    project_id: Option<String>,
    family: Option<ModelFamily>,
    max_tokens: Option<u32>,
}

impl RawEntry {
    fn into_config(self, alias: &str) -> Result<ModelAuthConfig, StoreError> {
        let invalid = |reason: String| StoreError::InvalidEntry {
            alias: alias.to_string(),
            reason,
        };

        if self.endpoint_id.trim().is_empty() {
            return Err(invalid("endpoint_id is empty".to_string()));
        }
        let auth_method = match self.auth_method.as_deref() {
            Some(s) => s.parse::<AuthMethod>().map_err(|e| invalid(e.message))?,
            None => AuthMethod::BearerToken,
        };
        let api_shape = match self.api_shape.as_deref() {
            Some(s) => s.parse::<ApiShape>().map_err(|e| invalid(e.message))?,
            None => ApiShape::ChatCompletions,
        };
        if self.max_tokens == Some(0) {
            return Err(invalid("max_tokens must be positive".to_string()));
        }

        let mut config = ModelAuthConfig::new(alias, self.endpoint_id, auth_method, api_shape)
            .with_region(self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()));
        config.display_name = self.name.unwrap_or_else(|| alias.to_string());
        config.endpoint = self.endpoint.filter(|e| !e.trim().is_empty());
        config.project_id = self.project_id.filter(|p| !p.trim().is_empty());
        config.max_tokens = self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if let Some(family) = self.family {
            config.family = family;
        }
        Ok(config)
    }
}

/// Validated model definitions keyed by alias.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: BTreeMap<String, ModelAuthConfig>,
    source: Option<PathBuf>,
}

impl ModelCatalog {
    /// Returns the default catalog path.
    ///
    /// `$VTX_MODELS` if set, else `<config dir>/vtx/models.yaml`.
    pub fn default_path() -> PathBuf {
        Self::path_from(std::env::var_os(VTX_MODELS))
    }

    fn path_from(override_path: Option<OsString>) -> PathBuf {
        match override_path.filter(|p| !p.is_empty()) {
            Some(path) => PathBuf::from(path),
            None => dirs::config_dir()
                .map(|c| c.join("vtx"))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(CATALOG_FILE),
        }
    }

    /// Loads the catalog from the default path.
    pub fn load_default() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads the catalog from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog = Self::from_yaml(&content)?;
        catalog.source = Some(path.to_path_buf());
        info!(path = %path.display(), models = catalog.len(), "Loaded model catalog");
        Ok(catalog)
    }

    /// Parses a catalog from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, StoreError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let raw: Option<BTreeMap<String, RawEntry>> = serde_yaml::from_str(content)?;
        let mut models = BTreeMap::new();
        for (alias, entry) in raw.unwrap_or_default() {
            let config = entry.into_config(&alias)?;
            debug!(
                alias = %alias,
                auth_method = %config.auth_method,
                api_shape = %config.api_shape,
                "Catalog entry"
            );
            models.insert(alias, config);
        }
        Ok(Self {
            models,
            source: None,
        })
    }

    /// Resolves an alias into the config an adapter is built from.
    ///
    /// The project id falls back to `GOOGLE_CLOUD_PROJECT` when the entry
    /// does not set one.
    pub fn resolve(&self, alias: &str, env: &Environment) -> Result<ModelAuthConfig, StoreError> {
        let mut config = self
            .models
            .get(alias)
            .cloned()
            .ok_or_else(|| StoreError::UnknownAlias {
                alias: alias.to_string(),
                available: self.aliases().map(str::to_string).collect(),
            })?;
        if config.project_id.is_none() {
            config.project_id.clone_from(&env.project_id);
        }
        Ok(config)
    }

    /// Returns the entry for an alias as written, without env fallbacks.
    pub fn get(&self, alias: &str) -> Option<&ModelAuthConfig> {
        self.models.get(alias)
    }

    /// Aliases in sorted order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// All entries in alias order.
    pub fn entries(&self) -> impl Iterator<Item = &ModelAuthConfig> {
        self.models.values()
    }

    /// Path the catalog was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True if the catalog defines no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
gemini-flash:
  name: Gemini 2.5 Flash
  endpoint_id: gemini-2.5-flash
  auth_method: bearer-token
  api_shape: vertex-native
  region: us-central1

sonnet:
  endpoint_id: claude-sonnet-4@20250514
  region: us-east5
  project_id: claude-project

llama:
  endpoint_id: meta/llama-3.3-70b-instruct-maas
  max_tokens: 1024
";

    #[test]
    fn test_defaults_and_inference() {
        let catalog = ModelCatalog::from_yaml(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);

        let sonnet = catalog.get("sonnet").unwrap();
        assert_eq!(sonnet.auth_method, AuthMethod::BearerToken);
        assert_eq!(sonnet.api_shape, ApiShape::ChatCompletions);
        assert_eq!(sonnet.family, ModelFamily::Claude);
        assert_eq!(sonnet.display_name, "sonnet");
        assert_eq!(sonnet.max_tokens, DEFAULT_MAX_TOKENS);

        let flash = catalog.get("gemini-flash").unwrap();
        assert_eq!(flash.display_name, "Gemini 2.5 Flash");
        assert_eq!(flash.api_shape, ApiShape::VertexNative);
        assert_eq!(flash.family, ModelFamily::Gemini);

        let llama = catalog.get("llama").unwrap();
        assert_eq!(llama.region, DEFAULT_REGION);
        assert_eq!(llama.family, ModelFamily::Other);
        assert_eq!(llama.max_tokens, 1024);
    }

    #[test]
    fn test_aliases_sorted() {
        let catalog = ModelCatalog::from_yaml(SAMPLE).unwrap();
        let aliases: Vec<_> = catalog.aliases().collect();
        assert_eq!(aliases, vec!["gemini-flash", "llama", "sonnet"]);
    }

    #[test]
    fn test_resolve_project_fallback() {
        let catalog = ModelCatalog::from_yaml(SAMPLE).unwrap();
        let env = Environment {
            project_id: Some("env-project".into()),
            ..Environment::default()
        };

        let llama = catalog.resolve("llama", &env).unwrap();
        assert_eq!(llama.project_id.as_deref(), Some("env-project"));

        let sonnet = catalog.resolve("sonnet", &env).unwrap();
        assert_eq!(sonnet.project_id.as_deref(), Some("claude-project"));
    }

    #[test]
    fn test_resolve_unknown_alias() {
        let catalog = ModelCatalog::from_yaml(SAMPLE).unwrap();
        let err = catalog
            .resolve("gpt-5", &Environment::default())
            .unwrap_err();
        match err {
            StoreError::UnknownAlias { alias, available } => {
                assert_eq!(alias, "gpt-5");
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_auth_method_rejected() {
        let err = ModelCatalog::from_yaml("m:\n  endpoint_id: x\n  auth_method: magic\n")
            .unwrap_err();
        match err {
            StoreError::InvalidEntry { alias, reason } => {
                assert_eq!(alias, "m");
                assert!(reason.contains("magic"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_endpoint_id_is_yaml_error() {
        let err = ModelCatalog::from_yaml("m:\n  name: nothing\n").unwrap_err();
        assert!(matches!(err, StoreError::Yaml(_)));
    }

    #[test]
    fn test_family_override() {
        let catalog =
            ModelCatalog::from_yaml("m:\n  endpoint_id: my-tuned-model\n  family: claude\n")
                .unwrap();
        assert_eq!(catalog.get("m").unwrap().family, ModelFamily::Claude);
    }

    #[test]
    fn test_empty_document() {
        assert!(ModelCatalog::from_yaml("").unwrap().is_empty());
    }

    #[test]
    fn test_path_override() {
        assert_eq!(
            ModelCatalog::path_from(Some("/tmp/m.yaml".into())),
            PathBuf::from("/tmp/m.yaml")
        );
        let default = ModelCatalog::path_from(None);
        assert!(default.ends_with("vtx/models.yaml"));
        assert_eq!(ModelCatalog::path_from(Some(OsString::new())), default);
    }
}
