//! Server-sent-event parsing for streamed model responses.
//!
//! Both supported APIs stream `data: {json}` event blocks separated by
//! blank lines. Byte chunks can split events and even UTF-8 sequences, so
//! the buffer is kept as raw bytes and decoded per event block.

use futures_util::{Stream, StreamExt};

use crate::backend::LlmError;

const EVENT_SEPARATOR: &[u8] = b"\n\n";

/// Turn an HTTP response body into a stream of SSE `data:` payloads.
/// The terminal `[DONE]` sentinel is swallowed.
pub fn data_events(
    resp: reqwest::Response,
) -> impl Stream<Item = Result<String, LlmError>> + Send {
    let body = resp.bytes_stream();
    futures_util::stream::unfold(
        (body, Vec::<u8>::new(), std::collections::VecDeque::new(), false),
        |(mut body, mut buf, mut queue, mut done)| async move {
            loop {
                if let Some(payload) = queue.pop_front() {
                    return Some((Ok(payload), (body, buf, queue, done)));
                }
                if done {
                    return None;
                }
                match body.next().await {
                    Some(Ok(bytes)) => {
                        buf.extend_from_slice(&bytes);
                        drain_events(&mut buf, &mut queue);
                    }
                    Some(Err(e)) => {
                        done = true;
                        return Some((Err(LlmError::Http(e)), (body, buf, queue, done)));
                    }
                    None => {
                        done = true;
                        // a final event without trailing separator still counts
                        if !buf.is_empty() {
                            let rest = std::mem::take(&mut buf);
                            push_block(&rest, &mut queue);
                        }
                    }
                }
            }
        },
    )
}

fn drain_events(buf: &mut Vec<u8>, queue: &mut std::collections::VecDeque<String>) {
    while let Some(pos) = find_separator(buf) {
        let block: Vec<u8> = buf.drain(..pos + EVENT_SEPARATOR.len()).collect();
        push_block(&block, queue);
    }
}

fn push_block(block: &[u8], queue: &mut std::collections::VecDeque<String>) {
    let text = String::from_utf8_lossy(block);
    for line in text.lines() {
        let line = line.trim();
        if let Some(payload) = line.strip_prefix("data:") {
            let payload = payload.trim();
            if !payload.is_empty() && payload != "[DONE]" {
                queue.push_back(payload.to_string());
            }
        }
    }
}

fn find_separator(buf: &[u8]) -> Option<usize> {
    buf.windows(EVENT_SEPARATOR.len())
        .position(|w| w == EVENT_SEPARATOR)
}

/// Extract the token text from an OpenAI-style streamed chunk.
pub fn openai_delta(payload: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(payload).ok()?;
    json["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extract the token text from an Anthropic `content_block_delta` event.
pub fn anthropic_delta(payload: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(payload).ok()?;
    if json["type"].as_str() != Some("content_block_delta") {
        return None;
    }
    json["delta"]["text"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_delta() {
        let payload = r#"{"choices":[{"delta":{"content":"hello"}}]}"#;
        assert_eq!(openai_delta(payload).as_deref(), Some("hello"));
        assert_eq!(openai_delta(r#"{"choices":[{"delta":{}}]}"#), None);
        assert_eq!(openai_delta("not json"), None);
    }

    #[test]
    fn test_anthropic_delta() {
        let payload = r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"hi"}}"#;
        assert_eq!(anthropic_delta(payload).as_deref(), Some("hi"));
        let other = r#"{"type":"message_start"}"#;
        assert_eq!(anthropic_delta(other), None);
    }

    #[test]
    fn test_push_block_filters_done_and_noise() {
        let mut queue = std::collections::VecDeque::new();
        push_block(b"event: completion\ndata: {\"a\":1}\n\n", &mut queue);
        push_block(b"data: [DONE]\n\n", &mut queue);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0], "{\"a\":1}");
    }
}
