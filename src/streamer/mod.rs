//! Streamers turning model token deltas into [`StreamEvent`]s.
//!
//! - [`IncrementalJsonFieldStreamer`] follows a [`ResponseSchema`] and reports
//!   string, array and boolean fields while the JSON is still incomplete.
//! - [`ConversationalStreamer`] relays free-form chat text.
//!
//! Both return `futures::Stream`s that end with exactly one terminal event.
//!
//! [`ResponseSchema`]: crate::schema::ResponseSchema

mod conversational;
mod event;
mod scanner;
mod session;
mod structured;

pub use conversational::{build_contents, normalize_role, ChatEventStream, ChatMessage, ConversationalStreamer};
pub use event::{CompletionValue, StreamEvent};
pub use scanner::{scan, FieldScanner, ScanCursors};
pub use structured::{structured_request, FieldEventStream, IncrementalJsonFieldStreamer};
