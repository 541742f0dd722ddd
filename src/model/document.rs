//! Test document - the JSON tree behind every test element
//!
//! Every field is optional. Readers are tolerant: a missing or mistyped
//! field reads as `None`, never as an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field keys used by test documents
pub mod keys {
    pub const INGREDIENTS: &str = "ingredients";
    pub const TAGS: &str = "tags";
    pub const NOTES: &str = "notes";
    pub const CONFIDENCE: &str = "confidence";
    pub const EXTRACTED_TEXT: &str = "extracted_text";
    pub const ALTERATIONS: &str = "alterations";
}

/// The structured document of a test element
///
/// Key order follows insertion order, so serialization keeps the layout of
/// the file the document was read from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Document(Map::new())
    }

    /// Parse a document from JSON text; the top level must be an object
    pub fn parse(json: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(map) => Ok(Document(map)),
            other => Err(Error::InvalidDocument(format!(
                "expected a JSON object, found {}",
                value_kind(&other)
            ))),
        }
    }

    /// Read a string field
    pub fn string(&self, key: &str) -> Option<String> {
        string_field(&self.0, key)
    }

    /// Read an array-of-strings field
    pub fn string_array(&self, key: &str) -> Option<Vec<String>> {
        string_array_field(&self.0, key)
    }

    /// Read a nested object
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    pub fn object_mut(&mut self, key: &str) -> Option<&mut Map<String, Value>> {
        self.0.get_mut(key).and_then(Value::as_object_mut)
    }

    /// Write a string field, replacing any previous value
    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), Value::String(value.into()));
    }

    /// Compact JSON text
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

/// Read a field as text. Numbers and booleans are read as their textual
/// form; null, arrays and objects are treated as absent.
pub(crate) fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(scalar_text)
}

/// Read a field as a list of strings. Non-scalar items make the whole
/// field unreadable.
pub(crate) fn string_array_field(map: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    map.get(key)?
        .as_array()?
        .iter()
        .map(scalar_text)
        .collect::<Option<Vec<_>>>()
}

/// Parse a string-encoded float the way stored corpora expect
///
/// Accepts decimal and exponent forms with an optional `f`/`d` suffix, plus
/// the exact words `NaN` and `Infinity`. Anything else is malformed.
pub(crate) fn parse_float(text: &str) -> Option<f32> {
    let text = text.trim();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned == "NaN" || unsigned == "Infinity" {
        return text.replace("Infinity", "inf").parse().ok();
    }

    let body = text
        .strip_suffix(['f', 'F', 'd', 'D'])
        .unwrap_or(text);
    let well_formed = body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !well_formed {
        return None;
    }
    body.parse().ok()
}

/// Encode a float for storage (`0.87`, `1.0`, `NaN`, `1.0E-5`)
///
/// Magnitudes outside `[1e-3, 1e7)` use computerized scientific notation
/// with an upper-case `E` and at least one fraction digit.
pub(crate) fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{:?}", value);
    }

    let scientific = format!("{:e}", value);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => {
            format!("{}E{}", mantissa, exponent)
        }
        Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
        None => scientific,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
