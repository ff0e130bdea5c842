//! Structured-output helper: demand JSON from the model, tolerate the ways
//! models wrap it, retry once with a stricter instruction on parse failure.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};

/// Locate the JSON payload inside a model reply: strips markdown fences and
/// any prose around the outermost object or array.
pub fn extract_json_block(raw: &str) -> &str {
    let trimmed = raw.trim();
    // fenced block first
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            return after[..end].trim();
        }
    }
    // outermost object or array
    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(o), Some(c)) if c >= o => trimmed[o..=c].trim(),
        _ => trimmed,
    }
}

/// Run a completion expected to return JSON matching `T`. On a parse
/// failure the request is retried once with an explicit JSON-only
/// instruction appended; a second failure surfaces as `MalformedOutput`.
pub async fn complete_structured<T: DeserializeOwned>(
    backend: &dyn LlmBackend,
    req: LlmRequest,
) -> Result<T, LlmError> {
    let first = backend.complete(req.clone()).await?;
    match serde_json::from_str::<T>(extract_json_block(&first.content)) {
        Ok(parsed) => Ok(parsed),
        Err(first_err) => {
            warn!(error = %first_err, "structured output parse failed, retrying");
            let mut retry = req;
            retry.messages.push(Message {
                role: "assistant".to_string(),
                content: first.content,
            });
            retry.messages.push(Message::user(
                "That was not valid JSON. Respond again with ONLY the JSON, \
                 no prose and no code fences.",
            ));
            let second = backend.complete(retry).await?;
            serde_json::from_str::<T>(extract_json_block(&second.content))
                .map_err(|e| LlmError::MalformedOutput(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json_block(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_extract_fenced_json() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nanything else";
        assert_eq!(extract_json_block(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_with_prose() {
        let raw = "Sure! The result is [1, 2, 3] as requested.";
        assert_eq!(extract_json_block(raw), "[1, 2, 3]");
    }

    #[test]
    fn test_extract_array_in_fence_without_lang() {
        let raw = "```\n[{\"x\": 2}]\n```";
        assert_eq!(extract_json_block(raw), "[{\"x\": 2}]");
    }
}
