//! Text extraction from a raw model response.
//!
//! The response JSON belongs to the remote server, so its shape is checked
//! rather than assumed. Anything other than `choices[0].message.content`
//! produces a readable diagnostic that embeds the raw JSON, never a panic.

use super::client::ApiResult;
use crate::error::ResponseShapeError;
use serde_json::Value;

/// Pull `choices[0].message.content` out of a chat-completions response.
pub fn message_content(response: &Value) -> Result<&str, ResponseShapeError> {
    let choices = response
        .get("choices")
        .and_then(Value::as_array)
        .ok_or(ResponseShapeError::MissingField("choices"))?;
    let first = choices.first().ok_or(ResponseShapeError::EmptyChoices)?;
    let message = first
        .get("message")
        .ok_or(ResponseShapeError::MissingField("message"))?;
    let content = message
        .get("content")
        .ok_or(ResponseShapeError::MissingField("content"))?;
    content
        .as_str()
        .ok_or(ResponseShapeError::NotAString("content"))
}

/// The top-level `error` of a response body, unquoted when it is a string.
pub fn error_message(response: &Value) -> Option<String> {
    response.get("error").map(|err| match err {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Human-readable text for one result.
///
/// * captured error → `Error: <message>`
/// * body carrying a top-level `error` → `Error: <that value>`
/// * well-formed response → the message content
/// * anything else → `Error parsing response: …` followed by the raw JSON
pub fn extract_text(result: &ApiResult) -> String {
    let response = match result {
        Err(e) => return format!("Error: {}", e.error),
        Ok(v) => v,
    };

    if let Some(msg) = error_message(response) {
        return format!("Error: {msg}");
    }

    match message_content(response) {
        Ok(text) => text.to_string(),
        Err(shape) => {
            let raw = serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string());
            format!("Error parsing response: {shape}\nRaw response: {raw}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteApiError;
    use serde_json::json;

    #[test]
    fn extracts_content() {
        let resp = json!({"choices": [{"message": {"role": "assistant", "content": "Hello"}}]});
        assert_eq!(extract_text(&Ok(resp)), "Hello");
    }

    #[test]
    fn missing_choices_yields_diagnostic_with_raw_json() {
        let resp = json!({"id": "cmpl-1", "object": "chat.completion"});
        let text = extract_text(&Ok(resp));
        assert!(text.starts_with("Error parsing response"), "{text}");
        assert!(text.contains("missing field 'choices'"));
        assert!(text.contains("Raw response:"));
        assert!(text.contains("\"cmpl-1\""));
    }

    #[test]
    fn empty_choices_yields_diagnostic() {
        let text = extract_text(&Ok(json!({"choices": []})));
        assert!(text.contains("Error parsing response"));
        assert!(text.contains("'choices' is empty"));
    }

    #[test]
    fn null_content_is_shape_error() {
        let resp = json!({"choices": [{"message": {"content": null}}]});
        assert_eq!(
            message_content(&resp),
            Err(ResponseShapeError::NotAString("content"))
        );
    }

    #[test]
    fn captured_error_is_reported() {
        let result = Err(RemoteApiError::new("503 Server Error", Some(503)));
        assert_eq!(extract_text(&result), "Error: 503 Server Error");
    }

    #[test]
    fn error_body_is_reported() {
        let resp = json!({"error": "model overloaded"});
        assert_eq!(extract_text(&Ok(resp)), "Error: model overloaded");

        let resp = json!({"error": {"code": 42}});
        assert_eq!(extract_text(&Ok(resp)), "Error: {\"code\":42}");
    }

    #[test]
    fn error_message_unquotes_strings() {
        assert_eq!(
            error_message(&json!({"error": "busy"})).as_deref(),
            Some("busy")
        );
        assert_eq!(
            error_message(&json!({"error": {"code": 1}})).as_deref(),
            Some("{\"code\":1}")
        );
        assert_eq!(error_message(&json!({"choices": []})), None);
    }
}
