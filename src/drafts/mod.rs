//! Typed accumulation of streamed results.
//!
//! A draft starts empty and is updated from each [`StreamEvent`] as it is
//! relayed, so callers can persist the result after the terminal event
//! without re-parsing the wire records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::streamer::{CompletionValue, StreamEvent};

/// A partial result that can absorb stream events.
pub trait StreamDraft {
    /// Fold one event into the draft.
    fn apply(&mut self, event: &StreamEvent);

    /// Fold a sequence of events.
    fn apply_all<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a StreamEvent>,
        Self: Sized,
    {
        for event in events {
            self.apply(event);
        }
    }
}

fn string_of(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn strings_of(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(string_of).collect())
}

/// Draft of a problem analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDraft {
    /// Short title.
    pub title: String,
    /// Concept tags.
    pub tags: Vec<String>,
    /// What the student got right.
    pub praise: String,
    /// What the student got wrong.
    pub diagnosis: String,
    /// Analogy-based explanation.
    pub explanation: String,
    /// A similar problem to practise on.
    pub practice_problem: String,
}

impl AnalysisDraft {
    fn text_slot(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "title" => Some(&mut self.title),
            "praise" => Some(&mut self.praise),
            "diagnosis" => Some(&mut self.diagnosis),
            "explanation" => Some(&mut self.explanation),
            "practice_problem" => Some(&mut self.practice_problem),
            _ => None,
        }
    }

    fn overlay(&mut self, object: &Map<String, Value>) {
        for (key, value) in object {
            if key == "tags" {
                if let Some(tags) = strings_of(value) {
                    self.tags = tags;
                }
            } else if let (Some(slot), Some(text)) = (self.text_slot(key), string_of(value)) {
                *slot = text;
            }
        }
    }
}

impl StreamDraft for AnalysisDraft {
    fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Partial { field, text_delta } => {
                if let Some(slot) = self.text_slot(field) {
                    slot.push_str(text_delta);
                }
            }
            StreamEvent::ArrayUpdate { field, items } if field == "tags" => self.tags = items.clone(),
            StreamEvent::Complete { value: CompletionValue::Parsed(Value::Object(object)) } => self.overlay(object),
            _ => {}
        }
    }
}

/// Draft of a practice-question evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GymDraft {
    /// Whether the attempt was correct; `None` until reported.
    pub is_correct: Option<bool>,
    /// Feedback on the attempt.
    pub feedback: String,
    /// Worked solution.
    pub solution: String,
    /// Follow-up question.
    pub next_question: String,
}

impl GymDraft {
    fn text_slot(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "feedback" => Some(&mut self.feedback),
            "solution" => Some(&mut self.solution),
            "next_question" => Some(&mut self.next_question),
            _ => None,
        }
    }
}

impl StreamDraft for GymDraft {
    fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Partial { field, text_delta } => {
                if let Some(slot) = self.text_slot(field) {
                    slot.push_str(text_delta);
                }
            }
            StreamEvent::BooleanDetected { field, value } if field == "is_correct" => {
                self.is_correct = Some(*value);
            }
            StreamEvent::Complete { value: CompletionValue::Parsed(Value::Object(object)) } => {
                for (key, value) in object {
                    if key == "is_correct" {
                        if let Some(flag) = value.as_bool() {
                            self.is_correct = Some(flag);
                        }
                    } else if let (Some(slot), Some(text)) = (self.text_slot(key), string_of(value)) {
                        *slot = text;
                    }
                }
            }
            _ => {}
        }
    }
}

/// Value of one field in a [`FieldDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// String field.
    Text(String),
    /// Array field.
    List(Vec<String>),
    /// Boolean field.
    Flag(bool),
}

/// Draft for an arbitrary schema, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDraft {
    /// Values seen so far.
    pub fields: BTreeMap<String, FieldValue>,
    /// Raw text of a degraded completion, if any.
    pub fallback_text: Option<String>,
}

impl FieldDraft {
    /// Text accumulated for `field`.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field)? {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl StreamDraft for FieldDraft {
    fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Partial { field, text_delta } => {
                let entry = self
                    .fields
                    .entry(field.clone())
                    .or_insert_with(|| FieldValue::Text(String::new()));
                if let FieldValue::Text(text) = entry {
                    text.push_str(text_delta);
                }
            }
            StreamEvent::ArrayUpdate { field, items } => {
                self.fields.insert(field.clone(), FieldValue::List(items.clone()));
            }
            StreamEvent::BooleanDetected { field, value } => {
                self.fields.insert(field.clone(), FieldValue::Flag(*value));
            }
            StreamEvent::Complete { value: CompletionValue::Parsed(Value::Object(object)) } => {
                for (key, value) in object {
                    let parsed = match value {
                        Value::String(text) => FieldValue::Text(text.clone()),
                        Value::Bool(flag) => FieldValue::Flag(*flag),
                        Value::Array(_) => FieldValue::List(strings_of(value).unwrap_or_default()),
                        _ => continue,
                    };
                    self.fields.insert(key.clone(), parsed);
                }
            }
            StreamEvent::Complete { value: CompletionValue::Text(raw) } => {
                self.fallback_text = Some(raw.clone());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_analysis_draft_from_events() {
        let mut draft = AnalysisDraft::default();
        draft.apply_all(&[
            StreamEvent::Partial { field: "title".into(), text_delta: "Chain ".into() },
            StreamEvent::Partial { field: "title".into(), text_delta: "rule".into() },
            StreamEvent::ArrayUpdate { field: "tags".into(), items: vec!["Calc".into()] },
            StreamEvent::ArrayUpdate { field: "tags".into(), items: vec!["Calculus".into(), "Chain".into()] },
            StreamEvent::Partial { field: "unknown".into(), text_delta: "ignored".into() },
        ]);

        assert_eq!(draft.title, "Chain rule");
        assert_eq!(draft.tags, vec!["Calculus", "Chain"]);
        assert_eq!(draft.praise, "");
    }

    #[test]
    fn test_analysis_draft_overlay_from_complete() {
        let mut draft = AnalysisDraft {
            title: "Cha".into(),
            ..AnalysisDraft::default()
        };
        draft.apply(&StreamEvent::Complete {
            value: CompletionValue::Parsed(json!({
                "title": "Chain rule",
                "tags": ["Calculus"],
                "praise": "Good setup",
                "diagnosis": "Missed inner derivative",
                "explanation": "Gears",
                "practice_problem": "d/dx sin(x^2)"
            })),
        });

        assert_eq!(draft.title, "Chain rule");
        assert_eq!(draft.practice_problem, "d/dx sin(x^2)");
    }

    #[test]
    fn test_analysis_draft_ignores_fallback() {
        let mut draft = AnalysisDraft { title: "kept".into(), ..AnalysisDraft::default() };
        draft.apply(&StreamEvent::Complete { value: CompletionValue::Text("garbage".into()) });
        assert_eq!(draft.title, "kept");
    }

    #[test]
    fn test_gym_draft() {
        let mut draft = GymDraft::default();
        draft.apply_all(&[
            StreamEvent::BooleanDetected { field: "is_correct".into(), value: false },
            StreamEvent::Partial { field: "feedback".into(), text_delta: "Sign error".into() },
            StreamEvent::Partial { field: "next_question".into(), text_delta: "Try 2x".into() },
        ]);

        assert_eq!(draft.is_correct, Some(false));
        assert_eq!(draft.feedback, "Sign error");
        assert_eq!(draft.next_question, "Try 2x");
    }

    #[test]
    fn test_field_draft_generic() {
        let mut draft = FieldDraft::default();
        draft.apply_all(&[
            StreamEvent::Partial { field: "a".into(), text_delta: "x".into() },
            StreamEvent::Partial { field: "a".into(), text_delta: "y".into() },
            StreamEvent::BooleanDetected { field: "b".into(), value: true },
            StreamEvent::Complete { value: CompletionValue::Text("oops".into()) },
        ]);

        assert_eq!(draft.text("a"), Some("xy"));
        assert_eq!(draft.fields.get("b"), Some(&FieldValue::Flag(true)));
        assert_eq!(draft.fallback_text.as_deref(), Some("oops"));
    }
}
