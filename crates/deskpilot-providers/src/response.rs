//! Text extraction from provider response envelopes.

use serde_json::Value;

/// Pull the primary text out of a provider response.
///
/// Tried in order, first hit wins:
/// 1. `output_text` string
/// 2. the first `output[].content[].text` string (Responses API)
/// 3. `choices[0].message.content`, either a string or an array of `{text}` parts
/// 4. the root itself when it is a string
pub fn extract_text(root: &Value) -> Option<String> {
    if let Some(text) = root.get("output_text").and_then(Value::as_str) {
        return Some(text.to_string());
    }

    if let Some(output) = root.get("output").and_then(Value::as_array) {
        let text = output
            .iter()
            .filter_map(|item| item.get("content").and_then(Value::as_array))
            .flatten()
            .find_map(|part| part.get("text").and_then(Value::as_str));
        if let Some(text) = text {
            return Some(text.to_string());
        }
    }

    if let Some(content) = root
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
    {
        match content {
            Value::String(s) => return Some(s.clone()),
            Value::Array(parts) => {
                if let Some(text) = parts.iter().find_map(|p| p.get("text").and_then(Value::as_str)) {
                    return Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    root.as_str().map(str::to_string)
}

/// Parse `body` as JSON and extract its text. Falls back to the body itself
/// when it is not JSON or carries no recognizable text.
pub fn extract_text_or_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| extract_text(&v))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_text_wins() {
        let v = json!({"output_text": "a", "output": [{"content": [{"text": "b"}]}]});
        assert_eq!(extract_text(&v).as_deref(), Some("a"));
    }

    #[test]
    fn test_responses_output_skips_items_without_content() {
        let v = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [{"type": "output_text", "text": "{\"steps\":[]}"}]}
            ]
        });
        assert_eq!(extract_text(&v).as_deref(), Some("{\"steps\":[]}"));
    }

    #[test]
    fn test_chat_completions_shapes() {
        let s = json!({"choices": [{"message": {"content": "plain"}}]});
        assert_eq!(extract_text(&s).as_deref(), Some("plain"));

        let parts = json!({"choices": [{"message": {"content": [{"type": "text", "text": "part"}]}}]});
        assert_eq!(extract_text(&parts).as_deref(), Some("part"));
    }

    #[test]
    fn test_root_string_and_miss() {
        assert_eq!(extract_text(&json!("raw")).as_deref(), Some("raw"));
        assert!(extract_text(&json!({"id": 1})).is_none());
    }

    #[test]
    fn test_extract_text_or_body_falls_back() {
        assert_eq!(extract_text_or_body("not json"), "not json");
        assert_eq!(extract_text_or_body("{\"id\":1}"), "{\"id\":1}");
        assert_eq!(extract_text_or_body("{\"output_text\":\"x\"}"), "x");
    }
}
