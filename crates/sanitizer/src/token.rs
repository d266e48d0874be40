//! Token model shared with the tokenizer and the DOM builder.
//!
//! Tokens are produced upstream, rewritten by the sanitizer and handed to tree
//! construction. Tags remember where they came from (a source span and whether
//! they were written with literal HTML syntax) so that a disallowed tag can be
//! turned back into exactly the text the author typed.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Byte offsets of a token in the page source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Start offset (inclusive)
    pub start: usize,
    /// End offset (exclusive)
    pub end: usize,
}

impl SourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The spanned slice of `source`, if the span is in bounds and on char
    /// boundaries.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        if self.start > self.end {
            return None;
        }
        source.get(self.start..self.end)
    }
}

/// How a tag was written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TagSyntax {
    /// Produced by wikitext syntax or by the pipeline itself
    #[default]
    Generated,
    /// Written as a literal HTML tag by the author
    Html,
}

/// An attribute key or value: plain text, or a token sequence that still has
/// to be flattened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrText {
    Text(String),
    Tokens(Vec<Token>),
}

impl AttrText {
    /// The textual form; token sequences are flattened to their text content.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            AttrText::Text(text) => Cow::Borrowed(text),
            AttrText::Tokens(tokens) => Cow::Owned(tokens_to_string(tokens)),
        }
    }

    /// Replace a token sequence by its flattened text
    pub fn flatten(&mut self) {
        if let AttrText::Tokens(tokens) = self {
            *self = AttrText::Text(tokens_to_string(tokens));
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, AttrText::Text(_))
    }
}

impl Default for AttrText {
    fn default() -> Self {
        AttrText::Text(String::new())
    }
}

impl From<&str> for AttrText {
    fn from(value: &str) -> Self {
        AttrText::Text(value.to_string())
    }
}

impl From<String> for AttrText {
    fn from(value: String) -> Self {
        AttrText::Text(value)
    }
}

impl From<Vec<Token>> for AttrText {
    fn from(value: Vec<Token>) -> Self {
        AttrText::Tokens(value)
    }
}

/// A key/value pair on a tag, with the literal source text of each side when
/// it differs from the processed form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attribute {
    pub key: AttrText,
    pub value: AttrText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_source: Option<String>,
}

impl Attribute {
    pub fn new(key: impl Into<AttrText>, value: impl Into<AttrText>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            key_source: None,
            value_source: None,
        }
    }

    /// Record the source text the value was written as
    pub fn with_value_source(mut self, source: impl Into<String>) -> Self {
        self.value_source = Some(source.into());
        self
    }

    /// Record the source text the key was written as
    pub fn with_key_source(mut self, source: impl Into<String>) -> Self {
        self.key_source = Some(source.into());
        self
    }

    pub fn key_text(&self) -> Cow<'_, str> {
        self.key.as_text()
    }

    pub fn value_text(&self) -> Cow<'_, str> {
        self.value.as_text()
    }
}

/// Outcome of sanitizing one attribute.
///
/// `rendered == None` means the attribute is gone from the output tree; the
/// original key and value are still kept so round-trip serialization can tell
/// whether anything observable changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Normalized (lowercased) key
    pub key: String,
    /// Sanitized value, or `None` when the attribute was dropped
    pub rendered: Option<String>,
    /// Value as originally written
    pub original: String,
    /// Key as originally written
    pub original_key: String,
}

impl AttributeRecord {
    pub fn is_dropped(&self) -> bool {
        self.rendered.is_none()
    }

    /// Whether the rendered value differs from what was written
    pub fn is_modified(&self) -> bool {
        self.rendered.as_deref() != Some(self.original.as_str())
    }
}

/// Name, attributes and provenance of a start, end or self-closing tag
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    /// Attributes removed by the sanitizer; never rendered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shadows: Vec<AttributeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
    #[serde(default)]
    pub syntax: TagSyntax,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Mark as written with literal HTML syntax
    pub fn html(mut self) -> Self {
        self.syntax = TagSyntax::Html;
        self
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(SourceSpan::new(start, end));
        self
    }

    pub fn with_attr(mut self, key: impl Into<AttrText>, value: impl Into<AttrText>) -> Self {
        self.attributes.push(Attribute::new(key, value));
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn is_html_syntax(&self) -> bool {
        self.syntax == TagSyntax::Html
    }

    /// Value of the first attribute named `key`
    pub fn attr(&self, key: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|a| a.key_text() == key)
            .map(|a| a.value_text())
    }

    /// The value `key` had in the source: its recorded source text if any,
    /// otherwise its current value.
    pub fn shadow_value(&self, key: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|a| a.key_text().eq_ignore_ascii_case(key))
            .map(|a| match &a.value_source {
                Some(src) => Cow::Borrowed(src.as_str()),
                None => a.value_text(),
            })
    }
}

/// One unit of the token stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Token {
    Open(Tag),
    Close(Tag),
    SelfClosing(Tag),
    Text(String),
    Comment(String),
}

impl Token {
    pub fn text(content: impl Into<String>) -> Self {
        Token::Text(content.into())
    }

    pub fn tag(&self) -> Option<&Tag> {
        match self {
            Token::Open(tag) | Token::Close(tag) | Token::SelfClosing(tag) => Some(tag),
            Token::Text(_) | Token::Comment(_) => None,
        }
    }

    /// A self-closing `<meta typeof="mw:EmptyLine">` placeholder. It has no
    /// visible content and passes through the sanitizer untouched.
    pub fn is_empty_line_marker(&self) -> bool {
        match self {
            Token::SelfClosing(tag) => {
                tag.name == "meta" && tag.attr("typeof").map_or(false, |v| v == "mw:EmptyLine")
            }
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Flatten a token sequence to its text content. Tags and comments
/// contribute nothing.
pub fn tokens_to_string(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        if let Token::Text(text) = token {
            out.push_str(text);
        }
    }
    out
}
