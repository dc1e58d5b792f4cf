//! Prompt templates.
//!
//! A template is fixed instruction text with two kinds of placeholder:
//!
//! - `{{{field}}}` interpolates a validated input field verbatim;
//! - `{{media url=field}}` attaches a data-URI field as an inline media part.
//!
//! Rendering is pure and infallible. Absent optional fields render as an
//! empty string in place, so the surrounding static text is always kept.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::{DataUri, ValidatedInput};

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\{\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}\}|\{\{\s*media\s+url=([A-Za-z_][A-Za-z0-9_]*)\s*\}\}",
    )
    .unwrap()
});

/// Errors raised while parsing template text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unsupported placeholder at byte {offset}: {snippet:?}")]
    UnsupportedPlaceholder { offset: usize, snippet: String },

    #[error("template text is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(String),
    Media(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl TryFrom<String> for PromptTemplate {
    type Error = TemplateError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::parse(source)
    }
}

impl From<PromptTemplate> for String {
    fn from(template: PromptTemplate) -> Self {
        template.source
    }
}

impl PromptTemplate {
    /// Parse template text, rejecting any `{{` that is not a known placeholder.
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(TemplateError::Empty);
        }

        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in PLACEHOLDER_PATTERN.captures_iter(&source) {
            let whole = caps.get(0).unwrap();
            push_literal(&source, cursor, whole.start(), &mut segments)?;

            if let Some(field) = caps.get(1) {
                segments.push(Segment::Field(field.as_str().to_string()));
            } else if let Some(field) = caps.get(2) {
                segments.push(Segment::Media(field.as_str().to_string()));
            }
            cursor = whole.end();
        }
        push_literal(&source, cursor, source.len(), &mut segments)?;

        Ok(Self { source, segments })
    }

    /// The original template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every referenced field, text or media, in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        self.collect_fields(|seg| match seg {
            Segment::Field(name) | Segment::Media(name) => Some(name),
            Segment::Text(_) => None,
        })
    }

    /// Fields interpolated as text, in order of first appearance.
    pub fn text_fields(&self) -> Vec<&str> {
        self.collect_fields(|seg| match seg {
            Segment::Field(name) => Some(name),
            _ => None,
        })
    }

    /// Fields attached as media, in order of first appearance.
    pub fn media_fields(&self) -> Vec<&str> {
        self.collect_fields(|seg| match seg {
            Segment::Media(name) => Some(name),
            _ => None,
        })
    }

    /// Render against validated input.
    pub fn render(&self, input: &ValidatedInput) -> RenderedPrompt {
        self.render_fields(input.as_map())
    }

    /// Render against a plain field map.
    pub fn render_fields(&self, fields: &Map<String, Value>) -> RenderedPrompt {
        let mut prompt = RenderedPrompt::default();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => prompt.push_text(text),
                Segment::Field(name) => prompt.push_text(&field_text(fields.get(name))),
                Segment::Media(name) => {
                    let raw = field_text(fields.get(name));
                    match DataUri::parse(&raw) {
                        Ok(uri) => prompt.push_media(uri),
                        Err(_) => prompt.push_text(&raw),
                    }
                }
            }
        }
        prompt
    }

    fn collect_fields<'a>(&'a self, pick: impl Fn(&'a Segment) -> Option<&'a String>) -> Vec<&'a str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.segments.iter().filter_map(pick) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

fn push_literal(
    source: &str,
    start: usize,
    end: usize,
    segments: &mut Vec<Segment>,
) -> Result<(), TemplateError> {
    let literal = &source[start..end];
    if let Some(pos) = literal.find("{{") {
        let offset = start + pos;
        let snippet: String = source[offset..].chars().take(24).collect();
        return Err(TemplateError::UnsupportedPlaceholder { offset, snippet });
    }
    if !literal.is_empty() {
        segments.push(Segment::Text(literal.to_string()));
    }
    Ok(())
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Rendered output
// ---------------------------------------------------------------------------

/// One part of a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Media(DataUri),
}

/// The literal request sent to a generative backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPrompt {
    parts: Vec<PromptPart>,
}

impl RenderedPrompt {
    /// A prompt with a single text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut prompt = Self::default();
        prompt.push_text(&text.into());
        prompt
    }

    pub fn parts(&self) -> &[PromptPart] {
        &self.parts
    }

    pub fn media(&self) -> impl Iterator<Item = &DataUri> {
        self.parts.iter().filter_map(|part| match part {
            PromptPart::Media(uri) => Some(uri),
            PromptPart::Text(_) => None,
        })
    }

    /// Flat text view; media parts appear as `[media: <mime>]`.
    pub fn text(&self) -> String {
        self.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(PromptPart::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(PromptPart::Text(text.to_string()));
        }
    }

    fn push_media(&mut self, uri: DataUri) {
        self.parts.push(PromptPart::Media(uri));
    }
}

impl fmt::Display for RenderedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                PromptPart::Text(text) => f.write_str(text)?,
                PromptPart::Media(uri) => write!(f, "[media: {}]", uri.mime_type())?,
            }
        }
        Ok(())
    }
}
