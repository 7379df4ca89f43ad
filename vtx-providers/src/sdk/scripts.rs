//! Python programs run with `<python> -c <script>`.
//!
//! Both read one JSON request from stdin:
//!
//! ```json
//! {"messages": [{"role": "user", "content": "..."}], "max_tokens": 1024,
//!  "stream": false, "model": "...", "project_id": "...", "region": "..."}
//! ```
//!
//! On success they print `{"content", "stop_reason", "model", "usage"}` to
//! stdout and exit 0. On failure they print `{"error", "error_type"}` to
//! stderr and exit 1.

/// Anthropic Vertex SDK (`pip install 'anthropic[vertex]'`).
pub const ANTHROPIC_SCRIPT: &str = r#"
import json
import sys


def fail(message, error_type):
    sys.stderr.write(json.dumps({"error": message, "error_type": error_type}))
    sys.exit(1)


try:
    from anthropic import AnthropicVertex
except ImportError as exc:
    fail(str(exc), "ImportError")

try:
    req = json.load(sys.stdin)
    system = "\n\n".join(m["content"] for m in req["messages"] if m["role"] == "system")
    messages = [m for m in req["messages"] if m["role"] != "system"]
    client = AnthropicVertex(project_id=req.get("project_id"), region=req["region"])
    kwargs = {"model": req["model"], "max_tokens": req["max_tokens"], "messages": messages}
    if system:
        kwargs["system"] = system
    msg = client.messages.create(**kwargs)
    text = "".join(b.text for b in msg.content if getattr(b, "type", "") == "text")
    print(json.dumps({
        "content": text,
        "stop_reason": msg.stop_reason,
        "model": msg.model,
        "usage": {
            "input_tokens": msg.usage.input_tokens,
            "output_tokens": msg.usage.output_tokens,
        },
    }))
except Exception as exc:
    fail(str(exc), type(exc).__name__)
"#;

/// Vertex AI SDK (`pip install google-cloud-aiplatform`).
pub const VERTEX_SCRIPT: &str = r#"
import json
import sys


def fail(message, error_type):
    sys.stderr.write(json.dumps({"error": message, "error_type": error_type}))
    sys.exit(1)


try:
    import vertexai
    from vertexai.generative_models import Content, GenerativeModel, Part
except ImportError as exc:
    fail(str(exc), "ImportError")

try:
    req = json.load(sys.stdin)
    vertexai.init(project=req.get("project_id"), location=req["region"])
    system = "\n\n".join(m["content"] for m in req["messages"] if m["role"] == "system")
    contents = [
        Content(
            role="model" if m["role"] == "assistant" else "user",
            parts=[Part.from_text(m["content"])],
        )
        for m in req["messages"]
        if m["role"] != "system"
    ]
    model = GenerativeModel(req["model"], system_instruction=system or None)
    resp = model.generate_content(
        contents, generation_config={"max_output_tokens": req["max_tokens"]}
    )
    candidate = resp.candidates[0] if resp.candidates else None
    text = "".join(
        p.text for p in (candidate.content.parts if candidate else []) if getattr(p, "text", None)
    )
    usage = getattr(resp, "usage_metadata", None)
    print(json.dumps({
        "content": text,
        "stop_reason": candidate.finish_reason.name if candidate else None,
        "model": req["model"],
        "usage": {
            "input_tokens": usage.prompt_token_count,
            "output_tokens": usage.candidates_token_count,
        } if usage else None,
    }))
except Exception as exc:
    fail(str(exc), type(exc).__name__)
"#;
