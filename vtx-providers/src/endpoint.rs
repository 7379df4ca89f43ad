//! Vertex AI endpoint construction.
//!
//! Every REST adapter builds its URL here so host selection and path
//! shapes live in one place.

use vtx_core::{AuthError, Environment, GOOGLE_CLOUD_PROJECT, ModelAuthConfig};

/// Region served by the location-less global host.
pub const GLOBAL_REGION: &str = "global";

/// Host used for the global region.
pub const GLOBAL_HOST: &str = "aiplatform.googleapis.com";

/// Host for a config.
///
/// `global` always uses [`GLOBAL_HOST`], even when a custom endpoint is
/// configured.
pub fn endpoint_host(config: &ModelAuthConfig) -> String {
    if config.region == GLOBAL_REGION {
        return GLOBAL_HOST.to_string();
    }
    match config.endpoint.as_deref() {
        Some(custom) if !custom.trim().is_empty() => custom.trim().trim_end_matches('/').to_string(),
        _ => format!("{}-aiplatform.googleapis.com", config.region),
    }
}

/// Scheme and host for a config.
///
/// A custom endpoint that already carries a scheme is used verbatim.
pub fn base_url(config: &ModelAuthConfig) -> String {
    let host = endpoint_host(config);
    if host.contains("://") {
        host
    } else {
        format!("https://{host}")
    }
}

/// Project id from the config, falling back to `GOOGLE_CLOUD_PROJECT`.
pub fn resolve_project(config: &ModelAuthConfig, env: &Environment) -> Result<String, AuthError> {
    config
        .project_id
        .clone()
        .or_else(|| env.project_id.clone())
        .ok_or_else(|| {
            AuthError::missing_env_var(GOOGLE_CLOUD_PROJECT)
                .with_step(format!("Or set project_id for '{}' in models.yaml", config.alias))
        })
}

fn location_prefix(config: &ModelAuthConfig, project: &str) -> String {
    format!(
        "{}/v1/projects/{project}/locations/{}",
        base_url(config),
        config.region
    )
}

/// OpenAPI chat-completions URL. The model travels in the body.
pub fn openapi_url(config: &ModelAuthConfig, project: &str) -> String {
    format!(
        "{}/endpoints/openapi/chat/completions",
        location_prefix(config, project)
    )
}

/// Anthropic publisher URL (`rawPredict` or `streamRawPredict`).
pub fn anthropic_url(config: &ModelAuthConfig, project: &str, stream: bool) -> String {
    let method = if stream { "streamRawPredict" } else { "rawPredict" };
    format!(
        "{}/publishers/anthropic/models/{}:{method}",
        location_prefix(config, project),
        config.model_id
    )
}

/// Google publisher URL (`generateContent` or SSE `streamGenerateContent`).
///
/// Without a project the project-less API-key path is used.
pub fn vertex_url(config: &ModelAuthConfig, project: Option<&str>, stream: bool) -> String {
    let prefix = match project {
        Some(project) => location_prefix(config, project),
        None => format!("{}/v1", base_url(config)),
    };
    let method = if stream {
        "streamGenerateContent?alt=sse"
    } else {
        "generateContent"
    };
    format!(
        "{prefix}/publishers/google/models/{}:{method}",
        config.model_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtx_core::{ApiShape, AuthErrorCode, AuthMethod};

    fn config(region: &str) -> ModelAuthConfig {
        ModelAuthConfig::new(
            "m",
            "gemini-2.5-pro",
            AuthMethod::BearerToken,
            ApiShape::VertexNative,
        )
        .with_region(region)
    }

    #[test]
    fn test_regional_host() {
        assert_eq!(
            endpoint_host(&config("us-south1")),
            "us-south1-aiplatform.googleapis.com"
        );
    }

    #[test]
    fn test_global_ignores_custom_endpoint() {
        let cfg = config("global").with_endpoint("custom.example.com");
        assert_eq!(endpoint_host(&cfg), "aiplatform.googleapis.com");
    }

    #[test]
    fn test_custom_endpoint() {
        let cfg = config("europe-west4").with_endpoint("private.example.com/");
        assert_eq!(endpoint_host(&cfg), "private.example.com");
        assert_eq!(base_url(&cfg), "https://private.example.com");

        let cfg = config("europe-west4").with_endpoint("http://127.0.0.1:8080");
        assert_eq!(base_url(&cfg), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_url_shapes() {
        let cfg = config("us-east5");
        assert_eq!(
            openapi_url(&cfg, "p"),
            "https://us-east5-aiplatform.googleapis.com/v1/projects/p/locations/us-east5/endpoints/openapi/chat/completions"
        );
        assert_eq!(
            vertex_url(&cfg, Some("p"), true),
            "https://us-east5-aiplatform.googleapis.com/v1/projects/p/locations/us-east5/publishers/google/models/gemini-2.5-pro:streamGenerateContent?alt=sse"
        );
        assert_eq!(
            vertex_url(&cfg, None, false),
            "https://us-east5-aiplatform.googleapis.com/v1/publishers/google/models/gemini-2.5-pro:generateContent"
        );

        let mut claude = cfg.clone();
        claude.model_id = "claude-sonnet-4@20250514".into();
        assert!(anthropic_url(&claude, "p", false).ends_with("/publishers/anthropic/models/claude-sonnet-4@20250514:rawPredict"));
        assert!(anthropic_url(&claude, "p", true).ends_with(":streamRawPredict"));
    }

    #[test]
    fn test_project_resolution() {
        let env = Environment {
            project_id: Some("from-env".into()),
            ..Environment::default()
        };
        assert_eq!(resolve_project(&config("us-east5"), &env).unwrap(), "from-env");
        assert_eq!(
            resolve_project(&config("us-east5").with_project("own"), &env).unwrap(),
            "own"
        );

        let err = resolve_project(&config("us-east5"), &Environment::default()).unwrap_err();
        assert_eq!(err.code, AuthErrorCode::MissingEnvVar);
        assert_eq!(err.env_var.as_deref(), Some(GOOGLE_CLOUD_PROJECT));
    }
}
