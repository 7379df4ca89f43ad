//! Chat-completions request bodies and response parsing.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use vtx_core::{AuthError, ChatRequest, ChatResponse, StreamChunk, Usage};
use vtx_fetch::{Decoded, EventDecoder};

/// Builds the chat-completions request body.
pub fn build_body(model_id: &str, request: &ChatRequest, stream: bool) -> Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system_prompt() {
        messages.push(json!({ "role": "system", "content": system }));
    }
    for message in request.conversation() {
        messages.push(json!({
            "role": message.role.as_str(),
            "content": message.content,
        }));
    }

    let mut body = json!({
        "model": model_id,
        "messages": messages,
        "max_tokens": request.max_tokens,
        "stream": stream,
    });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    body
}

// ============================================================================
// Non-streaming
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Extracts `choices[0].message.content` and metadata.
pub fn parse_response(value: Value) -> Result<ChatResponse, AuthError> {
    let response: CompletionResponse = serde_json::from_value(value).map_err(|e| {
        AuthError::network(format!("Unexpected chat-completions response: {e}"))
    })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AuthError::network("Chat-completions response has no choices"))?;
    let content = choice
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| AuthError::network("Chat-completions response has no message content"))?;

    Ok(ChatResponse {
        content,
        stop_reason: choice.finish_reason,
        model: response.model,
        usage: response.usage.map(|u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}

// ============================================================================
// Streaming
// ============================================================================

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Decodes `choices[0].delta` events. A `finish_reason` ends the stream.
#[derive(Debug, Default)]
pub struct ChatCompletionsDecoder;

impl EventDecoder for ChatCompletionsDecoder {
    fn decode(&mut self, event: &Value) -> Result<Decoded, AuthError> {
        let event = match StreamEvent::deserialize(event) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "Ignoring unrecognised chat-completions event");
                return Ok(Decoded::skip());
            }
        };

        if let Some(error) = event.error {
            return Err(AuthError::network(format!(
                "Stream error from backend: {}",
                error_message(&error)
            )));
        }

        let Some(choice) = event.choices.into_iter().next() else {
            return Ok(Decoded::skip());
        };
        let text = choice.delta.and_then(|d| d.content).unwrap_or_default();

        match choice.finish_reason {
            Some(reason) => Ok(Decoded::finish(vec![StreamChunk::stop(text, reason)])),
            None if text.is_empty() => Ok(Decoded::skip()),
            None => Ok(Decoded::emit(StreamChunk::text(text))),
        }
    }
}

fn error_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_string)
}
