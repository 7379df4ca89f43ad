//! Integration tests for core configuration and token types.

use vtx_core::{
    AccessToken, ApiShape, AuthMethod, CachedToken, ChatRequest, ModelAuthConfig, ModelFamily,
};

#[test]
fn test_config_serialization_roundtrip() {
    let config = ModelAuthConfig::new(
        "flash",
        "gemini-2.5-flash",
        AuthMethod::BearerToken,
        ApiShape::VertexNative,
    )
    .with_endpoint("custom.example.com");

    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"bearer-token\""));
    assert!(json.contains("\"vertex-native\""));

    let parsed: ModelAuthConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
    assert_eq!(parsed.family, ModelFamily::Gemini);
}

#[test]
fn test_cached_token_from_fresh_token() {
    let token = AccessToken::expiring_in("t", chrono::Duration::hours(1));
    let cached = CachedToken::new(token).unwrap();
    assert!(cached.is_valid());
    assert!(!cached.needs_refresh());
}

#[test]
fn test_request_serializes_without_empty_options() {
    let json = serde_json::to_value(ChatRequest::prompt("hi", 32)).unwrap();
    assert!(json.get("temperature").is_none());
    assert_eq!(json["messages"][0]["role"], "user");
}
