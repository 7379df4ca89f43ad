//! `generateContent` bodies, responses and stream events.

use serde::Deserialize;
use serde_json::{Value, json};
use vtx_core::{AuthError, ChatRequest, ChatResponse, Role, StreamChunk, Usage};
use vtx_fetch::{Decoded, EventDecoder};

/// Builds a `generateContent` body.
///
/// Assistant turns use the `model` role; system text moves to
/// `systemInstruction`.
pub fn build_body(request: &ChatRequest) -> Value {
    let contents: Vec<Value> = request
        .conversation()
        .map(|m| {
            let role = if m.role == Role::Assistant { "model" } else { "user" };
            json!({ "role": role, "parts": [{ "text": m.content }] })
        })
        .collect();

    let mut generation = json!({ "maxOutputTokens": request.max_tokens });
    if let Some(temperature) = request.temperature {
        generation["temperature"] = json!(temperature);
    }

    let mut body = json!({
        "contents": contents,
        "generationConfig": generation,
    });
    if let Some(system) = request.system_prompt() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
    }
    body
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl GenerateResponse {
    fn check_error(&self) -> Result<(), AuthError> {
        if let Some(err) = &self.error {
            return Err(AuthError::network(format!(
                "Vertex AI error {}: {}",
                err.status.as_deref().unwrap_or("UNKNOWN"),
                err.message.as_deref().unwrap_or("no message")
            )));
        }
        if self.candidates.is_empty() {
            if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
                return Err(AuthError::network(format!("Prompt blocked by Vertex AI: {reason}")));
            }
        }
        Ok(())
    }

    fn first_candidate(self) -> Option<Candidate> {
        self.candidates.into_iter().next()
    }
}

impl Candidate {
    fn texts(&self) -> impl Iterator<Item = &str> {
        self.content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
    }
}

/// Joins `candidates[0].content.parts[].text`.
pub fn parse_response(value: Value) -> Result<ChatResponse, AuthError> {
    let response: GenerateResponse = serde_json::from_value(value)
        .map_err(|e| AuthError::network(format!("Unexpected generateContent response: {e}")))?;
    response.check_error()?;

    let model = response.model_version.clone();
    let usage = response.usage_metadata.as_ref().map(|u| Usage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });
    let candidate = response
        .first_candidate()
        .ok_or_else(|| AuthError::network("generateContent response has no candidates"))?;

    Ok(ChatResponse {
        content: candidate.texts().collect(),
        stop_reason: candidate.finish_reason.clone(),
        model,
        usage,
    })
}

/// Decodes `streamGenerateContent?alt=sse` events.
#[derive(Debug, Default)]
pub struct VertexDecoder;

impl EventDecoder for VertexDecoder {
    fn decode(&mut self, event: &Value) -> Result<Decoded, AuthError> {
        let response = GenerateResponse::deserialize(event).unwrap_or_default();
        response.check_error()?;

        let Some(candidate) = response.first_candidate() else {
            return Ok(Decoded::skip());
        };

        let mut chunks: Vec<StreamChunk> = candidate
            .texts()
            .filter(|text| !text.is_empty())
            .map(StreamChunk::text)
            .collect();

        match candidate.finish_reason {
            Some(reason) => {
                chunks.push(StreamChunk::stop("", reason));
                Ok(Decoded::finish(chunks))
            }
            None => Ok(Decoded {
                chunks,
                finished: false,
            }),
        }
    }
}
