use crate::editor::StructuredDocument;
use crate::suggestion::{TextEdit, TextRange};
use crate::text::{char_len, slice_chars, splice_chars};

/// A document whose content can be addressed as a flat run of chars.
///
/// Every successful `replace_range` bumps `version`. Offsets are char
/// offsets into `text()`.
pub trait RangeableDocument {
    fn text(&self) -> String;

    fn version(&self) -> u64;

    fn char_len(&self) -> usize {
        char_len(&self.text())
    }

    fn slice(&self, range: TextRange) -> Option<String> {
        slice_chars(&self.text(), range).map(str::to_string)
    }

    /// Whether `replace_range` is able to edit `range` as a unit.
    fn can_replace(&self, range: TextRange) -> bool;

    fn replace_range(&mut self, range: TextRange, replacement: &str) -> Option<TextEdit>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlainDocument {
    text: String,
    version: u64,
}

impl PlainDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            version: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl RangeableDocument for PlainDocument {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn char_len(&self) -> usize {
        char_len(&self.text)
    }

    fn slice(&self, range: TextRange) -> Option<String> {
        slice_chars(&self.text, range).map(str::to_string)
    }

    fn can_replace(&self, range: TextRange) -> bool {
        range.end <= char_len(&self.text)
    }

    fn replace_range(&mut self, range: TextRange, replacement: &str) -> Option<TextEdit> {
        if !splice_chars(&mut self.text, range, replacement) {
            return None;
        }
        self.version += 1;
        Some(TextEdit::new(range, char_len(replacement)))
    }
}

/// Either document representation behind one type, so callers can pick the
/// adapter at load time.
#[derive(Clone, Debug)]
pub enum AnyDocument {
    Plain(PlainDocument),
    Structured(StructuredDocument),
}

impl AnyDocument {
    pub fn is_structured(&self) -> bool {
        matches!(self, AnyDocument::Structured(_))
    }
}

impl From<PlainDocument> for AnyDocument {
    fn from(document: PlainDocument) -> Self {
        AnyDocument::Plain(document)
    }
}

impl From<StructuredDocument> for AnyDocument {
    fn from(document: StructuredDocument) -> Self {
        AnyDocument::Structured(document)
    }
}

impl RangeableDocument for AnyDocument {
    fn text(&self) -> String {
        match self {
            AnyDocument::Plain(doc) => doc.text(),
            AnyDocument::Structured(doc) => doc.text(),
        }
    }

    fn version(&self) -> u64 {
        match self {
            AnyDocument::Plain(doc) => doc.version(),
            AnyDocument::Structured(doc) => doc.version(),
        }
    }

    fn char_len(&self) -> usize {
        match self {
            AnyDocument::Plain(doc) => doc.char_len(),
            AnyDocument::Structured(doc) => doc.char_len(),
        }
    }

    fn slice(&self, range: TextRange) -> Option<String> {
        match self {
            AnyDocument::Plain(doc) => doc.slice(range),
            AnyDocument::Structured(doc) => doc.slice(range),
        }
    }

    fn can_replace(&self, range: TextRange) -> bool {
        match self {
            AnyDocument::Plain(doc) => doc.can_replace(range),
            AnyDocument::Structured(doc) => doc.can_replace(range),
        }
    }

    fn replace_range(&mut self, range: TextRange, replacement: &str) -> Option<TextEdit> {
        match self {
            AnyDocument::Plain(doc) => doc.replace_range(range, replacement),
            AnyDocument::Structured(doc) => doc.replace_range(range, replacement),
        }
    }
}
