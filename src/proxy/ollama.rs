//! Ollama request and response shapes.
//!
//! Requests are handled as raw JSON so that every field the proxy does not touch is
//! forwarded exactly as the caller sent it.

use serde_json::Value;

/// An intercepted inference endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /api/generate`, prompt in `prompt`, output in `response`.
    Generate,
    /// `POST /api/chat`, prompt in the last `user` message, output in `message.content`.
    Chat,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Generate => "/api/generate",
            Self::Chat => "/api/chat",
        }
    }
}

pub fn model(body: &Value) -> Option<&str> {
    body.get("model").and_then(Value::as_str)
}

/// Ollama streams unless the caller sends `"stream": false`.
pub fn is_streaming(body: &Value) -> bool {
    body.get("stream").and_then(Value::as_bool).unwrap_or(true)
}

fn last_user_message(body: &Value) -> Option<&Value> {
    body.get("messages")?
        .as_array()?
        .iter()
        .rev()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
}

/// The user's prompt text, if the request carries one.
pub fn extract_prompt(endpoint: Endpoint, body: &Value) -> Option<String> {
    let text = match endpoint {
        Endpoint::Generate => body.get("prompt")?.as_str()?,
        Endpoint::Chat => last_user_message(body)?.get("content")?.as_str()?,
    };
    (!text.trim().is_empty()).then(|| text.to_string())
}

/// Replace the prompt in place. Returns `false` if the request has no prompt slot.
pub fn replace_prompt(endpoint: Endpoint, body: &mut Value, prompt: String) -> bool {
    let slot = match endpoint {
        Endpoint::Generate => body.get_mut("prompt"),
        Endpoint::Chat => body
            .get_mut("messages")
            .and_then(Value::as_array_mut)
            .and_then(|messages| {
                messages
                    .iter_mut()
                    .rev()
                    .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
            })
            .and_then(|m| m.get_mut("content")),
    };
    match slot {
        Some(slot) if slot.is_string() => {
            *slot = Value::String(prompt);
            true
        }
        _ => false,
    }
}

fn chunk_text(endpoint: Endpoint, chunk: &Value) -> Option<&str> {
    match endpoint {
        Endpoint::Generate => chunk.get("response")?.as_str(),
        Endpoint::Chat => chunk.get("message")?.get("content")?.as_str(),
    }
}

/// Reassemble the model's full output from a relayed body.
///
/// Streaming bodies are NDJSON and count as complete only when a chunk carries
/// `"done": true`. A single JSON body is complete unless it says `"done": false`.
/// Returns `None` for partial or unparsable responses.
pub fn collect_response(endpoint: Endpoint, body: &[u8], streaming: bool) -> Option<String> {
    if !streaming {
        let value: Value = serde_json::from_slice(body).ok()?;
        let done = value.get("done").and_then(Value::as_bool).unwrap_or(true);
        return done.then(|| chunk_text(endpoint, &value).unwrap_or_default().to_string());
    }

    let text = std::str::from_utf8(body).ok()?;
    let mut out = String::new();
    let mut done = false;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let chunk: Value = serde_json::from_str(line).ok()?;
        if chunk.get("error").is_some() {
            return None;
        }
        if let Some(piece) = chunk_text(endpoint, &chunk) {
            out.push_str(piece);
        }
        if chunk.get("done").and_then(Value::as_bool) == Some(true) {
            done = true;
        }
    }
    done.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generate_prompt_round_trip() {
        let mut body = json!({"model": "llama3", "prompt": "Hi", "options": {"temperature": 0.2}});
        assert_eq!(extract_prompt(Endpoint::Generate, &body).as_deref(), Some("Hi"));
        assert!(replace_prompt(Endpoint::Generate, &mut body, "ctx\n\nHi".into()));
        assert_eq!(body["prompt"], "ctx\n\nHi");
        assert_eq!(body["options"]["temperature"], 0.2);
    }

    #[test]
    fn chat_uses_last_user_message() {
        let mut body = json!({
            "model": "llama3",
            "messages": [
                {"role": "system", "content": "Be brief"},
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "ok"},
                {"role": "user", "content": "second"}
            ]
        });
        assert_eq!(extract_prompt(Endpoint::Chat, &body).as_deref(), Some("second"));
        assert!(replace_prompt(Endpoint::Chat, &mut body, "injected".into()));
        assert_eq!(body["messages"][3]["content"], "injected");
        assert_eq!(body["messages"][1]["content"], "first");
    }

    #[test]
    fn missing_prompt() {
        let mut body = json!({"model": "llama3"});
        assert!(extract_prompt(Endpoint::Generate, &body).is_none());
        assert!(!replace_prompt(Endpoint::Generate, &mut body, "x".into()));
        assert!(extract_prompt(Endpoint::Chat, &json!({"messages": []})).is_none());
    }

    #[test]
    fn streaming_defaults_to_true() {
        assert!(is_streaming(&json!({"model": "m"})));
        assert!(!is_streaming(&json!({"model": "m", "stream": false})));
    }

    #[test]
    fn collects_complete_stream() {
        let body = b"{\"response\":\"Hello \",\"done\":false}\n{\"response\":\"world\",\"done\":true}\n";
        assert_eq!(
            collect_response(Endpoint::Generate, body, true).as_deref(),
            Some("Hello world")
        );
    }

    #[test]
    fn partial_stream_is_dropped() {
        let body = b"{\"response\":\"Hello \",\"done\":false}\n";
        assert!(collect_response(Endpoint::Generate, body, true).is_none());
        let truncated = b"{\"response\":\"Hello \",\"done\":false}\n{\"resp";
        assert!(collect_response(Endpoint::Generate, truncated, true).is_none());
    }

    #[test]
    fn collects_chat_single_response() {
        let body = br#"{"message":{"role":"assistant","content":"Sure."},"done":true}"#;
        assert_eq!(collect_response(Endpoint::Chat, body, false).as_deref(), Some("Sure."));
    }
}
