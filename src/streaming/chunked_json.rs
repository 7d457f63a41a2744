//! Chunked JSON parser for `streamGenerateContent` bodies.

use crate::error::{map_api_error, ApiErrorDetail, ResponseError, TutorError};
use crate::types::GenerateContentResponse;
use bytes::Bytes;
use futures::stream::Stream;
use serde::Deserialize;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Raw response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TutorError>> + Send>>;

/// One element of the streamed array: a response, or an in-band error.
#[derive(Deserialize)]
#[serde(untagged)]
enum StreamChunk {
    Error { error: ApiErrorDetail },
    Response(GenerateContentResponse),
}

/// Parser for Gemini's chunked JSON streaming format.
///
/// Handles objects split across network chunks, multi-byte UTF-8 sequences
/// split across chunks, braces inside string literals, and in-band
/// `{"error": {...}}` elements. The first error ends the stream.
pub struct GeminiChunkParser {
    inner: ByteStream,
    /// Decoded text not yet consumed.
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Inner stream exhausted.
    finished: bool,
    /// No more items will be produced.
    done: bool,
}

impl GeminiChunkParser {
    /// Create a new chunk parser from a byte stream.
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            buffer: String::new(),
            pending: Vec::new(),
            finished: false,
            done: false,
        }
    }

    /// Feed raw bytes and extract every complete response object.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<GenerateContentResponse, TutorError>> {
        let mut results = Vec::new();

        if let Err(e) = self.push_bytes(data) {
            results.push(Err(e));
            return results;
        }

        while let Some(result) = self.try_extract_object() {
            let failed = result.is_err();
            results.push(result);
            if failed {
                break;
            }
        }

        results
    }

    /// Append bytes to the text buffer, holding back an incomplete UTF-8 tail.
    fn push_bytes(&mut self, data: &[u8]) -> Result<(), TutorError> {
        self.pending.extend_from_slice(data);

        let valid_up_to = match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.pending.clear();
                return Ok(());
            }
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                return Err(ResponseError::MalformedChunk {
                    message: "Invalid UTF-8 in stream".to_string(),
                }
                .into());
            }
        };

        let tail = self.pending.split_off(valid_up_to);
        // The prefix was validated above.
        self.buffer.push_str(&String::from_utf8_lossy(&self.pending));
        self.pending = tail;
        Ok(())
    }

    /// Extract the next complete object from the buffer, if any.
    fn try_extract_object(&mut self) -> Option<Result<GenerateContentResponse, TutorError>> {
        self.skip_delimiters();

        if self.buffer.is_empty() {
            return None;
        }

        if !self.buffer.starts_with('{') {
            return Some(Err(ResponseError::MalformedChunk {
                message: format!("Unexpected data in stream: {}", preview(&self.buffer)),
            }
            .into()));
        }

        let end = extract_json_object(&self.buffer)?;
        let json_str: String = self.buffer.drain(..end).collect();

        match serde_json::from_str::<StreamChunk>(&json_str) {
            Ok(StreamChunk::Response(response)) => Some(Ok(response)),
            Ok(StreamChunk::Error { error }) => Some(Err(map_api_error(&error.status, error.message))),
            Err(e) => Some(Err(ResponseError::Deserialization {
                message: e.to_string(),
                body: json_str,
            }
            .into())),
        }
    }

    /// Drop whitespace, commas and the array brackets from the front of the buffer.
    fn skip_delimiters(&mut self) {
        let skip = self
            .buffer
            .find(|c: char| !(c.is_whitespace() || matches!(c, ',' | '[' | ']')))
            .unwrap_or(self.buffer.len());
        self.buffer.drain(..skip);
    }

    /// Report anything left over once the inner stream has ended.
    fn flush(&mut self) -> Option<Result<GenerateContentResponse, TutorError>> {
        if let Some(result) = self.try_extract_object() {
            return Some(result);
        }

        if self.buffer.is_empty() && self.pending.is_empty() {
            None
        } else {
            Some(Err(ResponseError::MalformedChunk {
                message: format!("Stream ended mid-object: {}", preview(&self.buffer)),
            }
            .into()))
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(64).collect()
}

/// Byte length of the complete JSON object at the start of `input`, if any.
///
/// Tracks nesting depth, string boundaries and escapes so braces inside
/// string literals are ignored.
fn extract_json_object(input: &str) -> Option<usize> {
    if !input.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, byte) in input.bytes().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match byte {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' | b'[' if !in_string => depth += 1,
            b'}' | b']' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

impl Stream for GeminiChunkParser {
    type Item = Result<GenerateContentResponse, TutorError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if self.done {
                return Poll::Ready(None);
            }

            if let Some(result) = self.try_extract_object() {
                self.done = result.is_err();
                return Poll::Ready(Some(result));
            }

            if self.finished {
                self.done = true;
                return Poll::Ready(self.flush());
            }

            match futures::ready!(self.inner.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    if let Err(e) = self.push_bytes(&bytes) {
                        self.done = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => self.finished = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NetworkError, RateLimitError};
    use futures::StreamExt;

    fn parser_over(chunks: Vec<Result<Bytes, TutorError>>) -> GeminiChunkParser {
        GeminiChunkParser::new(Box::pin(futures::stream::iter(chunks)))
    }

    fn split_at_every(data: &str, size: usize) -> Vec<Result<Bytes, TutorError>> {
        data.as_bytes()
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect()
    }

    const TWO_CHUNKS: &str = r#"[{"candidates":[{"content":{"parts":[{"text":"Hello"}],"role":"model"}}],"usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":10,"totalTokenCount":15}},
{"candidates":[{"content":{"parts":[{"text":" World"}],"role":"model"}}],"usageMetadata":{"promptTokenCount":5,"candidatesTokenCount":12,"totalTokenCount":17}}]"#;

    #[test]
    fn test_extract_json_object_simple() {
        let buffer = r#"{"key": "value"}"#;
        assert_eq!(extract_json_object(buffer), Some(buffer.len()));
    }

    #[test]
    fn test_extract_json_object_nested() {
        let buffer = r#"{"outer": {"inner": "value"}}, {"next": "object"}"#;
        let end = extract_json_object(buffer).unwrap();
        assert_eq!(&buffer[..end], r#"{"outer": {"inner": "value"}}"#);
    }

    #[test]
    fn test_extract_json_object_with_string_braces() {
        let buffer = r#"{"key": "value with } brace"}"#;
        assert_eq!(extract_json_object(buffer), Some(buffer.len()));
    }

    #[test]
    fn test_extract_json_object_incomplete() {
        assert_eq!(extract_json_object(r#"{"key": "value"#), None);
    }

    #[test]
    fn test_extract_json_object_with_escapes() {
        let buffer = r#"{"key": "a \" quote and \\ backslash"}"#;
        assert_eq!(extract_json_object(buffer), Some(buffer.len()));
    }

    #[test]
    fn test_feed_returns_complete_objects_only() {
        let mut parser = parser_over(vec![]);
        let (head, tail) = TWO_CHUNKS.split_at(120);

        let first = parser.feed(head.as_bytes());
        assert_eq!(first.len(), 0);

        let rest = parser.feed(tail.as_bytes());
        let texts: Vec<String> = rest.into_iter().map(|r| r.unwrap().text()).collect();
        assert_eq!(texts, vec!["Hello", " World"]);
    }

    #[tokio::test]
    async fn test_parser_single_chunk() {
        let parser = parser_over(vec![Ok(Bytes::from(TWO_CHUNKS))]);
        let responses: Vec<_> = parser.map(|r| r.unwrap().text()).collect().await;
        assert_eq!(responses, vec!["Hello", " World"]);
    }

    #[tokio::test]
    async fn test_parser_byte_by_byte() {
        let parser = parser_over(split_at_every(TWO_CHUNKS, 1));
        let responses: Vec<_> = parser.map(|r| r.unwrap().text()).collect().await;
        assert_eq!(responses, vec!["Hello", " World"]);
    }

    #[tokio::test]
    async fn test_parser_multibyte_split() {
        let data = r#"[{"candidates":[{"content":{"parts":[{"text":"π ≈ 3.14 ✓"}]}}]}]"#;
        let parser = parser_over(split_at_every(data, 3));
        let responses: Vec<_> = parser.map(|r| r.unwrap().text()).collect().await;
        assert_eq!(responses, vec!["π ≈ 3.14 ✓"]);
    }

    #[tokio::test]
    async fn test_parser_empty_array() {
        let parser = parser_over(vec![Ok(Bytes::from_static(b"[]"))]);
        assert_eq!(parser.count().await, 0);
    }

    #[tokio::test]
    async fn test_parser_in_band_error() {
        let data = r#"[{"candidates":[{"content":{"parts":[{"text":"Hi"}]}}]},
{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}]"#;
        let mut parser = parser_over(vec![Ok(Bytes::from(data))]);

        assert_eq!(parser.next().await.unwrap().unwrap().text(), "Hi");
        let err = parser.next().await.unwrap().unwrap_err();
        assert!(matches!(err, TutorError::RateLimit(RateLimitError::QuotaExceeded { .. })));
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn test_parser_upstream_error_ends_stream() {
        let mut parser = parser_over(vec![
            Ok(Bytes::from_static(br#"[{"candidates":[]}"#)),
            Err(NetworkError::StreamInterrupted { message: "reset".to_string() }.into()),
            Ok(Bytes::from_static(br#",{"candidates":[]}]"#)),
        ]);

        assert!(parser.next().await.unwrap().is_ok());
        assert!(parser.next().await.unwrap().is_err());
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn test_parser_truncated_body() {
        let mut parser = parser_over(vec![Ok(Bytes::from_static(br#"[{"candidates":[{"content""#))]);
        let err = parser.next().await.unwrap().unwrap_err();
        assert!(matches!(err, TutorError::Response(ResponseError::MalformedChunk { .. })));
        assert!(parser.next().await.is_none());
    }
}
