//! Field scanner over a growing, not-yet-valid JSON buffer.
//!
//! [`scan`] is a pure function: given the whole buffer, the schema and the
//! cursors from the previous pass, it returns the events that became visible
//! and the advanced cursors. [`FieldScanner`] owns the buffer and cursors for
//! one session.
//!
//! Keys are matched on their first occurrence in the raw text that is
//! followed by `:` and a value of the right shape. A matching key that appears
//! earlier than the real one (leading prose, a nested object) therefore wins.

use std::collections::{HashMap, HashSet};

use super::event::{CompletionValue, StreamEvent};
use crate::schema::{FieldKind, ResponseSchema};

/// Emission state carried between scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanCursors {
    /// Characters of each string field's decoded value already emitted.
    emitted: HashMap<String, usize>,
    /// Boolean fields already reported.
    booleans_fired: HashSet<String>,
    /// Raw bracket content of the array field at its last emission.
    array_snapshot: String,
}

impl ScanCursors {
    /// Characters emitted so far for `field`.
    pub fn emitted(&self, field: &str) -> usize {
        self.emitted.get(field).copied().unwrap_or(0)
    }

    /// Whether the boolean `field` has been reported.
    pub fn boolean_fired(&self, field: &str) -> bool {
        self.booleans_fired.contains(field)
    }

    /// Raw array content at the last array emission.
    pub fn array_snapshot(&self) -> &str {
        &self.array_snapshot
    }
}

/// Scan `text` for field content not yet covered by `prior`.
///
/// Per pass: string fields in schema order, then unfired booleans, then the
/// array field.
///
/// ```
/// use integrations_tutor::schema::{FieldSchema, ResponseSchema};
/// use integrations_tutor::streamer::{scan, ScanCursors, StreamEvent};
///
/// let schema = ResponseSchema::new(vec![FieldSchema::string("title")]).unwrap();
///
/// let (events, cursors) = scan(r#"{"title": "Der"#, &schema, &ScanCursors::default());
/// assert_eq!(events, vec![StreamEvent::Partial { field: "title".into(), text_delta: "Der".into() }]);
///
/// let (events, _) = scan(r#"{"title": "Derivatives"#, &schema, &cursors);
/// assert_eq!(events, vec![StreamEvent::Partial { field: "title".into(), text_delta: "ivatives".into() }]);
/// ```
pub fn scan(text: &str, schema: &ResponseSchema, prior: &ScanCursors) -> (Vec<StreamEvent>, ScanCursors) {
    let mut cursors = prior.clone();
    let mut events = Vec::new();

    for field in schema.fields_of(FieldKind::String) {
        let Some((value, _)) = string_value(text, &field.name) else {
            continue;
        };
        let cursor = cursors.emitted(&field.name);
        let length = value.chars().count();
        if length > cursor {
            let delta: String = value.chars().skip(cursor).collect();
            events.push(StreamEvent::partial(&field.name, delta));
            cursors.emitted.insert(field.name.clone(), length);
        }
    }

    for field in schema.fields_of(FieldKind::Boolean) {
        if cursors.boolean_fired(&field.name) {
            continue;
        }
        if let Some(value) = boolean_value(text, &field.name) {
            events.push(StreamEvent::BooleanDetected {
                field: field.name.clone(),
                value,
            });
            cursors.booleans_fired.insert(field.name.clone());
        }
    }

    if let Some(field) = schema.array_field() {
        if let Some(raw) = array_content(text, &field.name) {
            if raw != cursors.array_snapshot {
                let items = array_items(raw);
                if !items.is_empty() {
                    events.push(StreamEvent::ArrayUpdate {
                        field: field.name.clone(),
                        items,
                    });
                    cursors.array_snapshot = raw.to_string();
                }
            }
        }
    }

    (events, cursors)
}

/// Buffer and cursors of one structured stream.
#[derive(Debug, Clone)]
pub struct FieldScanner {
    schema: ResponseSchema,
    text: String,
    cursors: ScanCursors,
}

impl FieldScanner {
    /// Start an empty session for `schema`.
    pub fn new(schema: ResponseSchema) -> Self {
        Self {
            schema,
            text: String::new(),
            cursors: ScanCursors::default(),
        }
    }

    /// Append a delta and return the events it uncovered.
    pub fn push(&mut self, delta: &str) -> Vec<StreamEvent> {
        if delta.is_empty() {
            return Vec::new();
        }
        self.text.push_str(delta);
        let (events, cursors) = scan(&self.text, &self.schema, &self.cursors);
        self.cursors = cursors;
        events
    }

    /// Everything received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current cursors.
    pub fn cursors(&self) -> &ScanCursors {
        &self.cursors
    }

    /// End the session with the terminal `Complete` event.
    pub fn finish(self) -> StreamEvent {
        StreamEvent::Complete {
            value: CompletionValue::from_accumulated(self.text),
        }
    }
}

/// Offset of the first value of key `name` accepted by `accept`.
fn find_value(text: &str, name: &str, accept: impl Fn(&str) -> bool) -> Option<usize> {
    let needle = format!("\"{}\"", name);
    text.match_indices(needle.as_str()).find_map(|(pos, _)| {
        let after_key = &text[pos + needle.len()..];
        let value = after_key.trim_start().strip_prefix(':')?.trim_start();
        accept(value).then(|| text.len() - value.len())
    })
}

/// Decoded value of string field `name`, and whether its closing quote arrived.
fn string_value(text: &str, name: &str) -> Option<(String, bool)> {
    let start = find_value(text, name, |v| v.starts_with('"'))? + 1;
    let (raw, closed) = string_body(&text[start..]);
    Some((decode_string(raw, closed), closed))
}

fn boolean_value(text: &str, name: &str) -> Option<bool> {
    let start = find_value(text, name, |v| v.starts_with("true") || v.starts_with("false"))?;
    Some(text[start..].starts_with("true"))
}

/// Raw content between `[` and its closing `]`, or to the end of the buffer.
fn array_content<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let start = find_value(text, name, |v| v.starts_with('['))? + 1;
    let rest = &text[start..];
    let bytes = rest.as_bytes();

    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match (in_string, bytes[i]) {
            (true, b'\\') => i += 1,
            (_, b'"') => in_string = !in_string,
            (false, b']') => return Some(&rest[..i]),
            _ => {}
        }
        i += 1;
    }
    Some(rest)
}

/// String literals inside raw array content. A trailing literal still being
/// written counts once it has decoded content.
fn array_items(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut rest = raw;

    while let Some(open) = rest.find('"') {
        let (body, closed) = string_body(&rest[open + 1..]);
        let item = decode_string(body, closed);
        if !closed {
            if !item.is_empty() {
                items.push(item);
            }
            break;
        }
        items.push(item);
        rest = &rest[open + 1 + body.len() + 1..];
    }
    items
}

/// Splits off the body of a string literal whose opening quote has been
/// consumed. Returns the body and whether an unescaped closing quote ended it.
fn string_body(rest: &str) -> (&str, bool) {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return (&rest[..i], true),
            _ => i += 1,
        }
    }
    (rest, false)
}

enum Escape {
    Char(char, usize),
    Verbatim(usize),
    Incomplete,
}

/// Decode JSON escapes in a string body.
///
/// For an open body, an escape cut off by the end of input is held back so
/// the decoded text only ever grows by appending.
fn decode_string(raw: &str, closed: bool) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut run_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        out.push_str(&raw[run_start..i]);
        match decode_escape(raw, i, closed) {
            Escape::Char(c, next) => {
                out.push(c);
                i = next;
            }
            Escape::Verbatim(next) => {
                out.push_str(&raw[i..next]);
                i = next;
            }
            Escape::Incomplete => return out,
        }
        run_start = i;
    }

    out.push_str(&raw[run_start..]);
    out
}

fn decode_escape(raw: &str, at: usize, closed: bool) -> Escape {
    let Some(kind) = raw[at + 1..].chars().next() else {
        return if closed { Escape::Verbatim(at + 1) } else { Escape::Incomplete };
    };

    let simple = match kind {
        '"' => Some('"'),
        '\\' => Some('\\'),
        '/' => Some('/'),
        'b' => Some('\u{8}'),
        'f' => Some('\u{c}'),
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        _ => None,
    };
    if let Some(c) = simple {
        return Escape::Char(c, at + 2);
    }
    if kind != 'u' {
        return Escape::Verbatim(at + 1 + kind.len_utf8());
    }

    let code = match hex4(raw, at + 2) {
        Hex::Value(code) => code,
        Hex::Short if !closed => return Escape::Incomplete,
        Hex::Short | Hex::Invalid => return Escape::Verbatim(at + 2),
    };

    match code {
        0xD800..=0xDBFF => {
            let after = at + 6;
            let tail = &raw[after..];
            if tail.starts_with("\\u") {
                match hex4(raw, after + 2) {
                    Hex::Value(low @ 0xDC00..=0xDFFF) => {
                        let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                        return Escape::Char(
                            char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER),
                            after + 6,
                        );
                    }
                    Hex::Short if !closed => return Escape::Incomplete,
                    _ => {}
                }
            } else if !closed && (tail.is_empty() || tail == "\\") {
                return Escape::Incomplete;
            }
            Escape::Char(char::REPLACEMENT_CHARACTER, after)
        }
        _ => Escape::Char(
            char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
            at + 6,
        ),
    }
}

enum Hex {
    Value(u32),
    Short,
    Invalid,
}

/// Four hex digits at `at`; `Short` when input ends first.
fn hex4(raw: &str, at: usize) -> Hex {
    let digits = &raw.as_bytes()[at.min(raw.len())..];
    let available = digits.len().min(4);
    if !digits[..available].iter().all(u8::is_ascii_hexdigit) {
        return Hex::Invalid;
    }
    if available < 4 {
        return Hex::Short;
    }
    // four ASCII hex digits, so the slice is on char boundaries
    u32::from_str_radix(&raw[at..at + 4], 16).map_or(Hex::Invalid, Hex::Value)
}
