//! Test element - one picture, its document, and its alterations
//!
//! Alterations are derived variants of the picture (a crop, a grayscale
//! pass...) that carry their own recognized text, confidence, notes and
//! tags inside the document's `alterations` object.
//!
//! The set of alterations is read from the live document on every call, so
//! the names accepted by [`TestElement::set_alteration_bitmap`] always match
//! [`TestElement::alteration_names`].

use super::document::{self, keys, Document};
use crate::{Lookup, Result};
use image::DynamicImage;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Confidence reported when none is stored or the stored one is unreadable.
///
/// A legitimately stored `-1` reads the same.
pub const CONFIDENCE_SENTINEL: f32 = -1.0;

/// A single test of the corpus
#[derive(Clone, Debug)]
pub struct TestElement {
    picture: Option<DynamicImage>,
    document: Document,
    file_name: String,
    /// Pictures attached to alterations, keyed by alteration name
    alteration_bitmaps: HashMap<String, DynamicImage>,
}

impl TestElement {
    /// Create a test element from an already loaded document
    pub fn new(
        picture: Option<DynamicImage>,
        document: Document,
        file_name: impl Into<String>,
    ) -> Self {
        let element = TestElement {
            picture,
            document,
            file_name: file_name.into(),
            alteration_bitmaps: HashMap::new(),
        };
        if let Some(names) = element.alteration_names() {
            debug!(
                file_name = %element.file_name,
                alterations = names.len(),
                "loaded test element"
            );
        }
        element
    }

    /// Parse the document from JSON text and create a test element
    pub fn from_json_str(
        picture: Option<DynamicImage>,
        json: &str,
        file_name: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(picture, Document::parse(json)?, file_name))
    }

    pub fn picture(&self) -> Option<&DynamicImage> {
        self.picture.as_ref()
    }

    pub fn set_picture(&mut self, picture: DynamicImage) {
        self.picture = Some(picture);
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    // === Top-level fields ===

    /// Raw comma-separated ingredient list
    pub fn ingredients(&self) -> Option<String> {
        self.top_level_string(keys::INGREDIENTS, "ingredients")
    }

    /// Ingredients split on commas, each one trimmed.
    ///
    /// `None` when the document has no ingredients. A blank list gives an
    /// empty vector and trailing empty items are dropped.
    pub fn ingredients_array(&self) -> Option<Vec<String>> {
        self.ingredients().map(|raw| split_ingredients(&raw))
    }

    pub fn tags(&self) -> Option<Vec<String>> {
        let tags = self.document.string_array(keys::TAGS);
        if tags.is_none() {
            debug!(file_name = %self.file_name, field = keys::TAGS, "tags: field not found");
        }
        tags
    }

    pub fn notes(&self) -> Option<String> {
        self.top_level_string(keys::NOTES, "notes")
    }

    /// Recognition confidence, or `None` when absent or malformed
    pub fn confidence_opt(&self) -> Option<f32> {
        let text = self.document.string(keys::CONFIDENCE).into();
        self.read_confidence(text, None)
    }

    /// Recognition confidence, [`CONFIDENCE_SENTINEL`] when absent or malformed
    pub fn confidence(&self) -> f32 {
        self.confidence_opt().unwrap_or(CONFIDENCE_SENTINEL)
    }

    /// Text extracted by the recognizer
    pub fn recognized_text(&self) -> Option<String> {
        self.top_level_string(keys::EXTRACTED_TEXT, "recognized_text")
    }

    /// Names of the alterations, in document order
    pub fn alteration_names(&self) -> Option<Vec<String>> {
        match self.document.object(keys::ALTERATIONS) {
            Some(alterations) => Some(alterations.keys().cloned().collect()),
            None => {
                debug!(file_name = %self.file_name, "alteration_names: no alterations");
                None
            }
        }
    }

    /// Store a confidence as its string encoding
    pub fn set_confidence(&mut self, confidence: f32) -> bool {
        self.document
            .set_string(keys::CONFIDENCE, document::format_float(confidence));
        true
    }

    pub fn set_recognized_text(&mut self, text: impl Into<String>) -> bool {
        self.document.set_string(keys::EXTRACTED_TEXT, text);
        true
    }

    // === Alterations ===

    pub fn alteration_recognized_text(&self, alteration: &str) -> Option<String> {
        self.alteration_string(alteration, keys::EXTRACTED_TEXT, "alteration_recognized_text")
    }

    pub fn alteration_confidence_opt(&self, alteration: &str) -> Option<f32> {
        let text = match self.alteration_fields(alteration, "alteration_confidence") {
            Some(fields) => document::string_field(fields, keys::CONFIDENCE).into(),
            None => return None,
        };
        self.read_confidence(text, Some(alteration))
    }

    /// Alteration confidence, [`CONFIDENCE_SENTINEL`] when the alteration or
    /// its confidence is missing
    pub fn alteration_confidence(&self, alteration: &str) -> f32 {
        self.alteration_confidence_opt(alteration)
            .unwrap_or(CONFIDENCE_SENTINEL)
    }

    pub fn alteration_notes(&self, alteration: &str) -> Option<String> {
        self.alteration_string(alteration, keys::NOTES, "alteration_notes")
    }

    pub fn alteration_tags(&self, alteration: &str) -> Option<Vec<String>> {
        let fields = self.alteration_fields(alteration, "alteration_tags")?;
        let tags = document::string_array_field(fields, keys::TAGS);
        if tags.is_none() {
            debug!(
                file_name = %self.file_name,
                alteration,
                field = keys::TAGS,
                "alteration_tags: field not found"
            );
        }
        tags
    }

    /// Picture attached to an alteration
    pub fn alteration_bitmap(&self, alteration: &str) -> Option<&DynamicImage> {
        let bitmap = self
            .alteration_bitmaps
            .get(alteration)
            .filter(|_| self.has_alteration(alteration));
        if bitmap.is_none() {
            debug!(
                file_name = %self.file_name,
                alteration,
                "alteration_bitmap: no bitmap set"
            );
        }
        bitmap
    }

    /// Attach a picture to an existing alteration.
    ///
    /// Returns `false` and leaves the element untouched when the document has
    /// no alteration with that name.
    pub fn set_alteration_bitmap(&mut self, alteration: &str, bitmap: DynamicImage) -> bool {
        if !self.has_alteration(alteration) {
            debug!(
                file_name = %self.file_name,
                alteration,
                "set_alteration_bitmap: no alteration with this name"
            );
            return false;
        }
        self.alteration_bitmaps
            .insert(alteration.to_string(), bitmap);
        true
    }

    /// Write the recognized text of an existing alteration
    pub fn set_alteration_recognized_text(
        &mut self,
        alteration: &str,
        text: impl Into<String>,
    ) -> bool {
        self.set_alteration_string(
            alteration,
            keys::EXTRACTED_TEXT,
            text.into(),
            "set_alteration_recognized_text",
        )
    }

    /// Write the confidence of an existing alteration
    pub fn set_alteration_confidence(&mut self, alteration: &str, confidence: f32) -> bool {
        self.set_alteration_string(
            alteration,
            keys::CONFIDENCE,
            document::format_float(confidence),
            "set_alteration_confidence",
        )
    }

    /// Compact JSON text of the document
    pub fn to_json_string(&self) -> String {
        self.document.to_json_string()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        self.document.to_json_pretty()
    }

    // === Internals ===

    fn has_alteration(&self, alteration: &str) -> bool {
        self.document
            .object(keys::ALTERATIONS)
            .is_some_and(|alterations| alterations.contains_key(alteration))
    }

    fn top_level_string(&self, key: &str, op: &'static str) -> Option<String> {
        let value = self.document.string(key);
        if value.is_none() {
            debug!(file_name = %self.file_name, field = key, "{}: field not found", op);
        }
        value
    }

    fn read_confidence(&self, text: Lookup<String>, alteration: Option<&str>) -> Option<f32> {
        let text = match text {
            Lookup::Found(text) => text,
            Lookup::Absent | Lookup::Failed(_) => {
                debug!(
                    file_name = %self.file_name,
                    alteration,
                    "confidence: field not found"
                );
                return None;
            }
        };
        let parsed = document::parse_float(&text);
        if parsed.is_none() {
            debug!(
                file_name = %self.file_name,
                alteration,
                value = %text,
                "confidence: stored value is not a number"
            );
        }
        parsed
    }

    /// Fields of a named alteration. Logs which of the two levels is missing.
    fn alteration_fields(&self, alteration: &str, op: &'static str) -> Option<&Map<String, Value>> {
        let Some(alterations) = self.document.object(keys::ALTERATIONS) else {
            debug!(file_name = %self.file_name, alteration, "{}: no alterations", op);
            return None;
        };
        let fields = alterations.get(alteration).and_then(Value::as_object);
        if fields.is_none() {
            debug!(
                file_name = %self.file_name,
                alteration,
                "{}: no alteration with this name",
                op
            );
        }
        fields
    }

    fn alteration_string(&self, alteration: &str, key: &str, op: &'static str) -> Option<String> {
        let fields = self.alteration_fields(alteration, op)?;
        let value = document::string_field(fields, key);
        if value.is_none() {
            debug!(
                file_name = %self.file_name,
                alteration,
                field = key,
                "{}: field not found",
                op
            );
        }
        value
    }

    fn set_alteration_string(
        &mut self,
        alteration: &str,
        key: &str,
        value: String,
        op: &'static str,
    ) -> bool {
        let file_name = &self.file_name;
        let Some(alterations) = self.document.object_mut(keys::ALTERATIONS) else {
            debug!(%file_name, alteration, "{}: no alterations", op);
            return false;
        };
        match alterations.get_mut(alteration).and_then(Value::as_object_mut) {
            Some(fields) => {
                fields.insert(key.to_string(), Value::String(value));
                true
            }
            None => {
                debug!(%file_name, alteration, "{}: no alteration with this name", op);
                false
            }
        }
    }
}

impl fmt::Display for TestElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.document.to_json_string())
    }
}

fn split_ingredients(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let mut items: Vec<String> = trimmed
        .split(',')
        .map(|item| item.trim().to_string())
        .collect();
    while items.last().is_some_and(|item| item.is_empty()) {
        items.pop();
    }
    items
}
