//! Snapshot of the environment variables this workspace consumes.

use std::path::PathBuf;

/// Project id variable.
pub const GOOGLE_CLOUD_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
/// Vertex API key variable.
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Service account / ADC file variable.
pub const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Interpreter override for SDK adapters.
pub const VTX_PYTHON_PATH: &str = "VTX_PYTHON_PATH";
/// Verbose request/response logging flag.
pub const VTX_DEBUG: &str = "VTX_DEBUG";

/// Interpreter used when no override is set.
pub const DEFAULT_PYTHON: &str = "python3";

/// Environment values captured once and injected where needed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// `GOOGLE_CLOUD_PROJECT`.
    pub project_id: Option<String>,
    /// `GOOGLE_API_KEY`.
    pub api_key: Option<String>,
    /// `GOOGLE_APPLICATION_CREDENTIALS`.
    pub credentials_file: Option<PathBuf>,
    /// `VTX_PYTHON_PATH`.
    pub python_path: Option<String>,
    /// `VTX_DEBUG`.
    pub debug: bool,
}

impl Environment {
    /// Reads the current process environment.
    pub fn from_process() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds an environment from an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            project_id: non_empty(GOOGLE_CLOUD_PROJECT),
            api_key: non_empty(GOOGLE_API_KEY),
            credentials_file: non_empty(GOOGLE_APPLICATION_CREDENTIALS).map(PathBuf::from),
            python_path: non_empty(VTX_PYTHON_PATH),
            debug: non_empty(VTX_DEBUG).is_some_and(|v| {
                matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
            }),
        }
    }

    /// Interpreter for SDK adapters.
    pub fn python(&self) -> &str {
        self.python_path.as_deref().unwrap_or(DEFAULT_PYTHON)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("project_id", &self.project_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("credentials_file", &self.credentials_file)
            .field("python_path", &self.python_path)
            .field("debug", &self.debug)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Environment::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_lookup() {
        let env = env_of(&[
            (GOOGLE_CLOUD_PROJECT, "proj"),
            (GOOGLE_API_KEY, ""),
            (VTX_DEBUG, "TRUE"),
        ]);
        assert_eq!(env.project_id.as_deref(), Some("proj"));
        assert!(env.api_key.is_none(), "empty values are treated as unset");
        assert!(env.debug);
        assert_eq!(env.python(), DEFAULT_PYTHON);
    }

    #[test]
    fn test_python_override() {
        let env = env_of(&[(VTX_PYTHON_PATH, "/opt/py/bin/python")]);
        assert_eq!(env.python(), "/opt/py/bin/python");
        assert!(!env.debug);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let env = env_of(&[(GOOGLE_API_KEY, "AIzaSecret")]);
        assert!(!format!("{env:?}").contains("AIzaSecret"));
    }
}
