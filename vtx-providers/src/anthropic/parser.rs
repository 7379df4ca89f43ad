//! Anthropic Messages API bodies, responses and stream events.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace};
use vtx_core::{AuthError, ChatRequest, ChatResponse, StreamChunk, Usage};
use vtx_fetch::{Decoded, EventDecoder};

/// API version required by Claude models on Vertex AI.
pub const ANTHROPIC_VERSION: &str = "vertex-2023-10-16";

/// Builds a `rawPredict` / `streamRawPredict` body.
pub fn build_body(request: &ChatRequest, stream: bool) -> Value {
    let messages: Vec<Value> = request
        .conversation()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut body = json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "messages": messages,
        "max_tokens": request.max_tokens,
        "stream": stream,
    });
    if let Some(system) = request.system_prompt() {
        body["system"] = json!(system);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn describe(&self) -> String {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{kind}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(kind), None) => kind.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

fn in_band_error(value: &Value) -> Option<AuthError> {
    if value.get("type").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let detail = value
        .get("error")
        .and_then(|e| ErrorBody::deserialize(e).ok())
        .map_or_else(|| "unknown error".to_string(), |e| e.describe());
    Some(AuthError::network(format!("Anthropic error: {detail}")))
}

/// Joins every `text` block of a Messages API response.
pub fn parse_response(value: Value) -> Result<ChatResponse, AuthError> {
    if let Some(err) = in_band_error(&value) {
        return Err(err);
    }

    let response: MessageResponse = serde_json::from_value(value)
        .map_err(|e| AuthError::network(format!("Unexpected Anthropic response: {e}")))?;

    let content: String = response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect();

    Ok(ChatResponse {
        content,
        stop_reason: response.stop_reason,
        model: response.model,
        usage: response.usage,
    })
}

/// Decodes Anthropic stream events.
///
/// Only `text_delta` content is surfaced; thinking, signature and tool
/// input deltas are dropped.
#[derive(Debug, Default)]
pub struct AnthropicDecoder;

impl EventDecoder for AnthropicDecoder {
    fn decode(&mut self, event: &Value) -> Result<Decoded, AuthError> {
        if let Some(err) = in_band_error(event) {
            return Err(err);
        }

        let kind = event.get("type").and_then(Value::as_str).unwrap_or_default();
        match kind {
            "ping" | "message_start" | "content_block_start" | "content_block_stop" => {
                Ok(Decoded::skip())
            }
            "content_block_delta" => {
                let delta = &event["delta"];
                match delta.get("type").and_then(Value::as_str) {
                    Some("text_delta") => {
                        let text = delta.get("text").and_then(Value::as_str).unwrap_or_default();
                        if text.is_empty() {
                            Ok(Decoded::skip())
                        } else {
                            Ok(Decoded::emit(StreamChunk::text(text)))
                        }
                    }
                    other => {
                        trace!(delta = ?other, "Dropping non-text delta");
                        Ok(Decoded::skip())
                    }
                }
            }
            "message_delta" => match event["delta"].get("stop_reason").and_then(Value::as_str) {
                Some(reason) => Ok(Decoded::emit(StreamChunk::stop("", reason))),
                None => Ok(Decoded::skip()),
            },
            "message_stop" => Ok(Decoded::finish(Vec::new())),
            other => {
                debug!(event_type = other, "Ignoring unknown Anthropic event");
                Ok(Decoded::skip())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vtx_core::AuthErrorCode;
    use vtx_fetch::SseParser;

    #[test]
    fn test_body_carries_version_and_system() {
        let request = ChatRequest::prompt("hello", 128).with_system("terse");
        let body = build_body(&request, true);
        assert_eq!(body["anthropic_version"], "vertex-2023-10-16");
        assert_eq!(body["system"], "terse");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_parse_text_blocks_only() {
        let response = parse_response(json!({
            "type": "message",
            "model": "claude-sonnet-4",
            "content": [
                { "type": "thinking", "thinking": "hmm" },
                { "type": "text", "text": "Hello" },
                { "type": "text", "text": " there" }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 5, "output_tokens": 3 }
        }))
        .unwrap();

        assert_eq!(response.content, "Hello there");
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(response.usage.unwrap().input_tokens, 5);
    }

    #[test]
    fn test_parse_error_body() {
        let err = parse_response(json!({
            "type": "error",
            "error": { "type": "overloaded_error", "message": "Overloaded" }
        }))
        .unwrap_err();
        assert_eq!(err.code, AuthErrorCode::NetworkError);
        assert!(err.message.contains("overloaded_error"));
    }

    #[test]
    fn test_thinking_swallowed_text_yielded() {
        let mut parser = SseParser::new(AnthropicDecoder);
        let input = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"m\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"let me see\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"signature_delta\",\"signature\":\"abc\"}}\n\n",
            "data: {\"type\":\"ping\"}\n\n",
            "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Answer\"}}\n\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );

        let chunks = parser.feed(input.as_bytes()).unwrap();
        assert_eq!(
            chunks,
            vec![StreamChunk::text("Answer"), StreamChunk::stop("", "end_turn")]
        );
        assert!(parser.is_finished());
    }

    #[test]
    fn test_stream_error_event_raises() {
        let mut decoder = AnthropicDecoder;
        let err = decoder
            .decode(&json!({"type":"error","error":{"type":"api_error","message":"boom"}}))
            .unwrap_err();
        assert!(err.message.contains("boom"));
    }
}
