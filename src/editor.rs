use tdoc::{Document, InlineStyle};

use crate::document::RangeableDocument;
use crate::suggestion::{Suggestion, SuggestionKind, TextEdit, TextRange};
use crate::text::{char_len, slice_chars};

mod content;
mod inspect;
mod structure;

use content::{apply_style_to_span_path, prune_and_merge_spans, replace_in_spans};
use inspect::collect_layout;
use structure::{ensure_document_initialized, leaf_spans_mut};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParagraphPath {
    steps: Vec<PathStep>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PathStep {
    Root(usize),
    Child(usize),
    Entry {
        entry_index: usize,
        paragraph_index: usize,
    },
    ChecklistItem {
        indices: Vec<usize>,
    },
}

impl ParagraphPath {
    fn new_root(idx: usize) -> Self {
        Self {
            steps: vec![PathStep::Root(idx)],
        }
    }

    fn from_steps(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    fn push_child(&mut self, idx: usize) {
        self.steps.push(PathStep::Child(idx));
    }

    fn push_entry(&mut self, entry_index: usize, paragraph_index: usize) {
        self.steps.push(PathStep::Entry {
            entry_index,
            paragraph_index,
        });
    }

    fn push_checklist_item(&mut self, indices: Vec<usize>) {
        self.steps.push(PathStep::ChecklistItem { indices });
    }

    fn pop(&mut self) {
        if self.steps.len() > 1 {
            self.steps.pop();
        }
    }

    fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Nesting depth below the document root.
    pub fn depth(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpanPath {
    indices: Vec<usize>,
}

impl SpanPath {
    fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    fn push(&mut self, idx: usize) {
        self.indices.push(idx);
    }

    fn pop(&mut self) {
        self.indices.pop();
    }

    fn indices(&self) -> &[usize] {
        &self.indices
    }
}

/// A run of span text inside the flattened document text.
#[derive(Clone, Debug)]
struct TextSegment {
    block: usize,
    span_path: SpanPath,
    start: usize,
    len: usize,
}

impl TextSegment {
    fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockEmphasis {
    Plain,
    Heading,
    Code,
}

/// One editable leaf of the tree (a text-bearing paragraph or a checklist
/// item) and where its text sits in the flattened document.
#[derive(Clone, Debug)]
pub struct BlockLayout {
    pub range: TextRange,
    pub first_prefix: String,
    pub continuation_prefix: String,
    pub emphasis: BlockEmphasis,
    path: ParagraphPath,
}

impl BlockLayout {
    pub fn path(&self) -> &ParagraphPath {
        &self.path
    }
}

#[derive(Clone, Debug, Default)]
struct Layout {
    text: String,
    blocks: Vec<BlockLayout>,
    segments: Vec<TextSegment>,
}

/// Rangeable view over a `tdoc` paragraph tree.
///
/// Leaf paragraphs and checklist items are flattened depth-first and joined
/// with `'\n'`. Edits are confined to a single leaf.
#[derive(Clone, Debug)]
pub struct StructuredDocument {
    document: Document,
    version: u64,
    layout: Layout,
}

impl StructuredDocument {
    pub fn new(mut document: Document) -> Self {
        ensure_document_initialized(&mut document);
        let layout = collect_layout(&document);
        Self {
            document,
            version: 0,
            layout,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn blocks(&self) -> &[BlockLayout] {
        &self.layout.blocks
    }

    fn block_for_range(&self, range: TextRange) -> Option<usize> {
        self.layout
            .blocks
            .iter()
            .position(|block| block.range.start <= range.start && range.end <= block.range.end)
    }

    fn rebuild_layout(&mut self) {
        self.layout = collect_layout(&self.document);
    }

    /// A copy of the tree with every suggestion applied as an inline mark:
    /// grammar as underline, word choice as highlight.
    pub fn marked_document(&self, suggestions: &[Suggestion]) -> Document {
        let mut document = self.document.clone();
        let mut ordered: Vec<&Suggestion> = suggestions.iter().collect();
        ordered.sort_by(|a, b| b.range.start.cmp(&a.range.start));

        for suggestion in ordered {
            let Some(block_idx) = self.block_for_range(suggestion.range) else {
                continue;
            };
            let style = mark_style(suggestion.kind);
            let path = self.layout.blocks[block_idx].path.clone();
            let Some(spans) = leaf_spans_mut(&mut document, &path) else {
                continue;
            };
            for segment in self
                .layout
                .segments
                .iter()
                .rev()
                .filter(|segment| segment.block == block_idx)
            {
                let start = suggestion.range.start.max(segment.start);
                let end = suggestion.range.end.min(segment.end());
                if start >= end {
                    continue;
                }
                apply_style_to_span_path(
                    spans,
                    segment.span_path.indices(),
                    start - segment.start,
                    end - segment.start,
                    style,
                );
            }
        }
        document
    }
}

fn mark_style(kind: SuggestionKind) -> InlineStyle {
    match kind {
        SuggestionKind::Grammar => InlineStyle::Underline,
        SuggestionKind::WordChoice => InlineStyle::Highlight,
    }
}

impl RangeableDocument for StructuredDocument {
    fn text(&self) -> String {
        self.layout.text.clone()
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn char_len(&self) -> usize {
        char_len(&self.layout.text)
    }

    fn slice(&self, range: TextRange) -> Option<String> {
        slice_chars(&self.layout.text, range).map(str::to_string)
    }

    fn can_replace(&self, range: TextRange) -> bool {
        self.block_for_range(range).is_some()
    }

    fn replace_range(&mut self, range: TextRange, replacement: &str) -> Option<TextEdit> {
        let block_idx = self.block_for_range(range)?;
        let path = self.layout.blocks[block_idx].path.clone();
        let local: Vec<(SpanPath, TextRange)> = self
            .layout
            .segments
            .iter()
            .filter(|segment| segment.block == block_idx)
            .filter(|segment| {
                if range.is_empty() {
                    segment.start <= range.start && range.start <= segment.end()
                } else {
                    segment.start < range.end && range.start < segment.end()
                }
            })
            .map(|segment| {
                let start = range.start.max(segment.start) - segment.start;
                let end = range.end.min(segment.end()) - segment.start;
                (segment.span_path.clone(), TextRange::new(start, end))
            })
            .collect();

        let spans = leaf_spans_mut(&mut self.document, &path)?;
        if !replace_in_spans(spans, &local, replacement) {
            return None;
        }
        prune_and_merge_spans(spans);
        if spans.is_empty() {
            spans.push(tdoc::Span::new_text(""));
        }

        self.version += 1;
        self.rebuild_layout();
        Some(TextEdit::new(range, char_len(replacement)))
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
