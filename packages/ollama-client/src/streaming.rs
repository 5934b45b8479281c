//! NDJSON streaming parser for Ollama chat completions.
//!
//! Converts a raw `reqwest` byte stream into `ChatCompletionChunk` values.
//! Ollama emits one JSON object per line; the last one carries `"done": true`.

use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::OllamaError;
use crate::types::ChatResponseRaw;

/// A single chunk from a streaming chat completion.
#[derive(Debug, Clone)]
pub struct ChatCompletionChunk {
    /// The text delta for this chunk.
    pub delta: String,
    /// Whether the stream is done.
    pub done: bool,
}

/// Stream adapter that converts raw NDJSON bytes into `ChatCompletionChunk` values.
pub struct ChatCompletionStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    /// Raw bytes not yet terminated by a newline. Multi-byte characters may
    /// straddle network chunks, so decoding waits for a whole line.
    buffer: Vec<u8>,
    finished: bool,
}

impl ChatCompletionStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            finished: false,
        }
    }
}

impl Stream for ChatCompletionStream {
    type Item = Result<ChatCompletionChunk, OllamaError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        loop {
            if let Some(chunk) = try_parse_line(&mut this.buffer) {
                if matches!(chunk, Ok(ChatCompletionChunk { done: true, .. }) | Err(_)) {
                    this.finished = true;
                }
                return Poll::Ready(Some(chunk));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(OllamaError::Network(e.to_string()))));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    // A final line may arrive without its trailing newline
                    if this.buffer.iter().all(u8::is_ascii_whitespace) {
                        return Poll::Ready(None);
                    }
                    this.buffer.push(b'\n');
                    return Poll::Ready(try_parse_line(&mut this.buffer));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Try to extract and parse a complete NDJSON line from the buffer.
/// Returns `None` if no complete line is available yet.
fn try_parse_line(buffer: &mut Vec<u8>) -> Option<Result<ChatCompletionChunk, OllamaError>> {
    loop {
        let newline_pos = buffer.iter().position(|&b| b == b'\n')?;
        let raw_line: Vec<u8> = buffer.drain(..=newline_pos).collect();

        let line = match std::str::from_utf8(&raw_line) {
            Ok(text) => text.trim(),
            Err(e) => {
                return Some(Err(OllamaError::Parse(format!(
                    "Invalid UTF-8 in stream: {}",
                    e
                ))))
            }
        };
        if line.is_empty() {
            continue;
        }

        return Some(match serde_json::from_str::<ChatResponseRaw>(line) {
            Ok(raw) => match raw.error {
                Some(error) => Err(OllamaError::Api(error)),
                None => Ok(ChatCompletionChunk {
                    delta: raw.message.map(|m| m.content).unwrap_or_default(),
                    done: raw.done,
                }),
            },
            Err(e) => Err(OllamaError::Parse(format!(
                "Failed to parse stream chunk: {} (data: {})",
                e,
                snippet(line, 200)
            ))),
        });
    }
}

/// First `max` characters of `line`, for error messages.
fn snippet(line: &str, max: usize) -> String {
    line.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn make_ndjson_bytes(lines: &[&str]) -> Vec<Result<Bytes, reqwest::Error>> {
        lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{}\n", line))))
            .collect()
    }

    #[tokio::test]
    async fn test_parse_single_chunk() {
        let data = make_ndjson_bytes(&[
            r#"{"message":{"role":"assistant","content":"Hello"},"done":false}"#,
            r#"{"message":{"role":"assistant","content":""},"done":true,"eval_count":3}"#,
        ]);

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "Hello");
        assert!(!chunk.done);

        let done = stream.next().await.unwrap().unwrap();
        assert!(done.done);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_line_split_across_byte_chunks() {
        let data: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from(r#"{"message":{"content":"Band "#)),
            Ok(Bytes::from("gap\"},\"done\":false}\n")),
            Ok(Bytes::from(r#"{"done":true}"#)),
        ];

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));

        let c1 = stream.next().await.unwrap().unwrap();
        assert_eq!(c1.delta, "Band gap");

        // Final line arrives without a trailing newline
        let done = stream.next().await.unwrap().unwrap();
        assert!(done.done);
    }

    #[tokio::test]
    async fn test_error_line_surfaces_as_api_error() {
        let data = make_ndjson_bytes(&[r#"{"error":"model 'x' not found"}"#]);

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, OllamaError::Api(msg) if msg.contains("not found")));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_byte_chunks() {
        let line = "{\"message\":{\"content\":\"a = 3.87 Å\"},\"done\":false}\n";
        let split = line.find('Å').unwrap() + 1;
        let bytes = line.as_bytes();
        let data: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::copy_from_slice(&bytes[..split])),
            Ok(Bytes::copy_from_slice(&bytes[split..])),
        ];

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta, "a = 3.87 Å");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_multibyte_line_is_parse_error() {
        let line = format!("{{{}αα not json", "x".repeat(198));
        let data = make_ndjson_bytes(&[line.as_str()]);

        let mut stream = ChatCompletionStream::new(futures::stream::iter(data));

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, OllamaError::Parse(msg) if msg.contains("data: {xxx")));
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_snippet_cuts_on_char_boundary() {
        assert_eq!(snippet("αβγ", 2), "αβ");
        assert_eq!(snippet("ab", 200), "ab");
    }
}
