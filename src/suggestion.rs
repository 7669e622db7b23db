use std::fmt;

use serde::{Deserialize, Serialize};

/// Half-open range of char offsets into the flattened document text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    pub fn empty_at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn shifted(&self, delta: isize) -> Self {
        let shift = |value: usize| -> usize {
            if delta >= 0 {
                value.saturating_add(delta as usize)
            } else {
                value.saturating_sub(delta.unsigned_abs())
            }
        };
        Self {
            start: shift(self.start),
            end: shift(self.end),
        }
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A committed document mutation: `range` is the replaced region in the
/// old text, `inserted_len` the char length of what took its place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub range: TextRange,
    pub inserted_len: usize,
}

impl TextEdit {
    pub fn new(range: TextRange, inserted_len: usize) -> Self {
        Self {
            range,
            inserted_len,
        }
    }

    pub fn delta(&self) -> isize {
        self.inserted_len as isize - self.range.len() as isize
    }

    pub fn is_noop(&self) -> bool {
        self.range.is_empty() && self.inserted_len == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionKind {
    Grammar,
    #[serde(alias = "wordchoice", alias = "word_choice")]
    WordChoice,
}

impl SuggestionKind {
    pub fn label(self) -> &'static str {
        match self {
            SuggestionKind::Grammar => "Grammar",
            SuggestionKind::WordChoice => "Word choice",
        }
    }

    /// Tag name used by the tagged markup variant of the oracle.
    pub fn tag_name(self) -> &'static str {
        match self {
            SuggestionKind::Grammar => "grammar",
            SuggestionKind::WordChoice => "wordchoice",
        }
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("grammar") {
            Some(SuggestionKind::Grammar)
        } else if name.eq_ignore_ascii_case("wordchoice") {
            Some(SuggestionKind::WordChoice)
        } else {
            None
        }
    }
}

/// An unanchored correction as produced by the suggestion oracle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedEdit {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(rename = "original", alias = "originalText")]
    pub original_text: String,
    #[serde(rename = "suggestion", alias = "replacementText")]
    pub replacement_text: String,
    #[serde(default)]
    pub explanation: String,
}

impl ProposedEdit {
    pub fn new(
        kind: SuggestionKind,
        original_text: impl Into<String>,
        replacement_text: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            original_text: original_text.into(),
            replacement_text: replacement_text.into(),
            explanation: explanation.into(),
        }
    }

    pub fn grammar(original_text: &str, replacement_text: &str, explanation: &str) -> Self {
        Self::new(
            SuggestionKind::Grammar,
            original_text,
            replacement_text,
            explanation,
        )
    }

    pub fn word_choice(original_text: &str, replacement_text: &str, explanation: &str) -> Self {
        Self::new(
            SuggestionKind::WordChoice,
            original_text,
            replacement_text,
            explanation,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuggestionId(pub u64);

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchConfidence {
    ExactMatch,
    FuzzyMatch,
}

/// Lifecycle of a suggestion id. The last three states are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionState {
    Pending,
    Active,
    Accepted,
    Rejected,
    Invalidated,
}

impl SuggestionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SuggestionState::Accepted | SuggestionState::Rejected | SuggestionState::Invalidated
        )
    }
}

/// A proposed edit resolved to a live range of the document.
///
/// `original_text` is the document text the range covered when it was
/// anchored. For a fuzzy match this differs from `proposed_text`, the
/// string the oracle asked for.
#[derive(Clone, Debug, PartialEq)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub kind: SuggestionKind,
    pub range: TextRange,
    pub original_text: String,
    pub proposed_text: String,
    pub replacement_text: String,
    pub explanation: String,
    pub confidence: MatchConfidence,
}
