//! Decoding of Gemini's streaming response body.
//!
//! `streamGenerateContent` returns a JSON array whose elements arrive
//! incrementally, one response object per element:
//! ```json
//! [{"candidates":[...],"usageMetadata":...},
//! {"candidates":[...],"usageMetadata":...}]
//! ```
//!
//! [`GeminiChunkParser`] turns the raw byte stream into a stream of
//! [`GenerateContentResponse`](crate::types::GenerateContentResponse) values,
//! one per array element, without waiting for the closing bracket.

mod chunked_json;

pub use chunked_json::{ByteStream, GeminiChunkParser};
