//! Output schemas for structured generations.
//!
//! A [`ResponseSchema`] is an ordered list of `(name, kind)` pairs. It drives
//! both the field scanner and the `responseSchema` sent to Gemini.

use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::error::SchemaError;

/// JSON type a field is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A JSON string, streamed as partial deltas.
    String,
    /// An array of strings, streamed as full replacements.
    StringArray,
    /// A JSON boolean, reported once.
    Boolean,
}

impl FieldKind {
    fn gemini_type(self) -> &'static str {
        match self {
            FieldKind::String => "STRING",
            FieldKind::StringArray => "ARRAY",
            FieldKind::Boolean => "BOOLEAN",
        }
    }
}

/// One expected output field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// JSON key.
    pub name: String,
    /// Expected type.
    pub kind: FieldKind,
    /// Guidance for the model, sent in the response schema.
    pub description: Option<String>,
}

impl FieldSchema {
    /// A string field.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// An array-of-strings field.
    pub fn string_array(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::StringArray)
    }

    /// A boolean field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// A field of any kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
        }
    }

    /// Attach a description.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered set of uniquely named fields.
///
/// ```
/// use integrations_tutor::schema::{FieldSchema, ResponseSchema};
///
/// let schema = ResponseSchema::new(vec![
///     FieldSchema::string("title"),
///     FieldSchema::string_array("tags"),
///     FieldSchema::boolean("is_correct"),
/// ]).unwrap();
///
/// assert_eq!(schema.array_field().unwrap().name, "tags");
/// assert!(ResponseSchema::new(vec![FieldSchema::string("a"), FieldSchema::boolean("a")]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseSchema {
    fields: Vec<FieldSchema>,
}

impl ResponseSchema {
    /// Build a schema, rejecting empty or duplicate names.
    pub fn new(fields: Vec<FieldSchema>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField { name: field.name.clone() });
            }
        }
        Ok(Self { fields })
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields of the given kind, in order.
    pub fn fields_of(&self, kind: FieldKind) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(move |f| f.kind == kind)
    }

    /// The tracked array field: the first `StringArray` declared.
    ///
    /// Later array fields are not streamed; they still appear in the final
    /// parsed value.
    pub fn array_field(&self) -> Option<&FieldSchema> {
        self.fields_of(FieldKind::StringArray).next()
    }

    /// Render as a Gemini `responseSchema` object.
    pub fn to_gemini_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = Map::new();
            property.insert("type".into(), json!(field.kind.gemini_type()));
            if field.kind == FieldKind::StringArray {
                property.insert("items".into(), json!({ "type": "STRING" }));
            }
            if let Some(description) = &field.description {
                property.insert("description".into(), json!(description));
            }
            properties.insert(field.name.clone(), Value::Object(property));
        }

        let names: Vec<&str> = self.fields.iter().map(|f| f.name.as_str()).collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": names,
            "propertyOrdering": names,
        })
    }

    /// Schema of a problem analysis.
    pub fn analysis() -> Self {
        Self {
            fields: vec![
                FieldSchema::string("title")
                    .describe("A short descriptive title for the analysis"),
                FieldSchema::string_array("tags")
                    .describe("A list of 3-5 relevant tags for the problem solved"),
                FieldSchema::string("praise")
                    .describe("A short text commending the student on the things they got right"),
                FieldSchema::string("diagnosis")
                    .describe("A short text highlighting what the student got wrong"),
                FieldSchema::string("explanation")
                    .describe("An explanation of what the student got wrong using a real-world analogy"),
                FieldSchema::string("practice_problem")
                    .describe("A practice problem similar to the original problem"),
            ],
        }
    }

    /// Schema of a practice-question evaluation.
    pub fn gym() -> Self {
        Self {
            fields: vec![
                FieldSchema::boolean("is_correct")
                    .describe("Indicates if the attempt is correct"),
                FieldSchema::string("feedback")
                    .describe("Feedback on the provided attempt"),
                FieldSchema::string("solution")
                    .describe("The step-by-step solution in LaTeX format"),
                FieldSchema::string("next_question").describe(
                    "A follow-up question to further challenge the student. \
                     Make it harder if is_correct is true, easier if false.",
                ),
            ],
        }
    }
}
