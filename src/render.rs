use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use tracing::debug;
use unicode_width::UnicodeWidthChar;

use crate::editor::{BlockEmphasis, BlockLayout};
use crate::suggestion::{Suggestion, SuggestionId, TextRange};
use crate::text::char_boundaries;
use crate::theme::Theme;

const TAB_WIDTH: usize = 4;

/// A contiguous run of document text, either plain or covered by exactly
/// one suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkedSegment {
    pub text: String,
    pub range: TextRange,
    pub suggestion: Option<SuggestionId>,
}

/// Gapless, non-overlapping segmentation of a document's text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkedDocument {
    segments: Vec<MarkedSegment>,
}

impl MarkedDocument {
    pub fn segments(&self) -> &[MarkedSegment] {
        &self.segments
    }

    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|segment| segment.text.as_str()).collect()
    }

    pub fn segment_for_offset(&self, offset: usize) -> Option<&MarkedSegment> {
        self.segments
            .iter()
            .find(|segment| segment.range.contains(offset))
    }

    pub fn suggestion_at(&self, offset: usize) -> Option<SuggestionId> {
        self.segment_for_offset(offset)
            .and_then(|segment| segment.suggestion)
    }
}

/// Splits `text` into marked segments, splicing suggestion boundaries from
/// the end of the text backwards. Suggestions that run past the text or
/// overlap one already placed are left unmarked.
pub fn mark_segments(text: &str, suggestions: &[Suggestion]) -> MarkedDocument {
    let boundaries = char_boundaries(text);
    let total = boundaries.len() - 1;

    let mut ordered: Vec<&Suggestion> = suggestions
        .iter()
        .filter(|suggestion| !suggestion.range.is_empty() && suggestion.range.end <= total)
        .collect();
    ordered.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    let slice = |range: TextRange| text[boundaries[range.start]..boundaries[range.end]].to_string();
    let mut reversed = Vec::with_capacity(ordered.len() * 2 + 1);
    let mut tail = total;
    for suggestion in ordered {
        let range = suggestion.range;
        if range.end > tail {
            debug!(id = %suggestion.id, range = %range, "overlapping suggestion left unmarked");
            continue;
        }
        if range.end < tail {
            let plain = TextRange::new(range.end, tail);
            reversed.push(MarkedSegment {
                text: slice(plain),
                range: plain,
                suggestion: None,
            });
        }
        reversed.push(MarkedSegment {
            text: slice(range),
            range,
            suggestion: Some(suggestion.id),
        });
        tail = range.start;
    }
    if tail > 0 {
        let plain = TextRange::new(0, tail);
        reversed.push(MarkedSegment {
            text: slice(plain),
            range: plain,
            suggestion: None,
        });
    }

    reversed.reverse();
    MarkedDocument { segments: reversed }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

/// Screen cells a suggestion occupies on one rendered line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitRegion {
    pub suggestion: SuggestionId,
    pub line: usize,
    pub start_column: u16,
    pub end_column: u16,
}

impl HitRegion {
    pub fn contains(&self, line: usize, column: u16) -> bool {
        self.line == line && self.start_column <= column && column < self.end_column
    }
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// Visual position of every char offset, including the end of the text.
    pub positions: Vec<CursorVisualPosition>,
    pub hit_regions: Vec<HitRegion>,
}

impl RenderResult {
    /// Char offset closest to a screen cell, for placing the cursor.
    pub fn offset_at(&self, line: usize, column: u16) -> Option<usize> {
        let mut first_on_line = None;
        let mut best = None;
        for (offset, position) in self.positions.iter().enumerate() {
            if position.line != line {
                continue;
            }
            first_on_line.get_or_insert(offset);
            if position.column <= column {
                best = Some(offset);
            }
        }
        best.or(first_on_line)
    }
}

pub struct RenderOptions<'a> {
    pub width: usize,
    pub left_padding: usize,
    pub cursor: Option<usize>,
    pub active: Option<SuggestionId>,
    /// Block layout of a structured document; empty for flat text.
    pub blocks: &'a [BlockLayout],
    pub theme: &'a Theme,
}

pub fn render_marked(
    marked: &MarkedDocument,
    suggestions: &[Suggestion],
    options: &RenderOptions<'_>,
) -> RenderResult {
    let mut renderer = Renderer::new(options);
    let mut fragments = Vec::new();
    let mut end_offset = 0;
    for segment in marked.segments() {
        let kind = segment.suggestion.and_then(|id| {
            suggestions
                .iter()
                .find(|suggestion| suggestion.id == id)
                .map(|suggestion| (id, suggestion.kind))
        });
        let style = match kind {
            Some((id, kind)) => options
                .theme
                .suggestion_style(kind, options.active == Some(id)),
            None => Style::default(),
        };
        tokenize_text(&segment.text, segment.range.start, style, &mut fragments);
        end_offset = segment.range.end;
    }
    fragments.push(FragmentItem::Token(Fragment::marker(end_offset)));

    renderer.render_fragments(&fragments);
    renderer.finish(marked, suggestions, end_offset)
}

struct Renderer<'a> {
    options: &'a RenderOptions<'a>,
    positions: Vec<Option<(CursorVisualPosition, u16)>>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a RenderOptions<'a>) -> Self {
        Self {
            options,
            positions: Vec::new(),
            lines: Vec::new(),
            current_line_index: 0,
        }
    }

    fn render_fragments(&mut self, fragments: &[FragmentItem]) {
        let mut paragraph_start = 0;
        let mut chunk_begin = 0;
        for (idx, item) in fragments.iter().enumerate() {
            if let FragmentItem::LineBreak { next_offset } = item {
                self.render_paragraph(&fragments[chunk_begin..idx], paragraph_start);
                paragraph_start = *next_offset;
                chunk_begin = idx + 1;
            }
        }
        self.render_paragraph(&fragments[chunk_begin..], paragraph_start);
    }

    fn render_paragraph(&mut self, fragments: &[FragmentItem], start_offset: usize) {
        let padding = " ".repeat(self.options.left_padding);
        let (first_prefix, continuation_prefix, emphasis) = match self.block_at(start_offset) {
            Some((block, true)) => (
                block.first_prefix.as_str(),
                block.continuation_prefix.as_str(),
                block.emphasis,
            ),
            Some((block, false)) => (
                block.continuation_prefix.as_str(),
                block.continuation_prefix.as_str(),
                block.emphasis,
            ),
            None => ("", "", BlockEmphasis::Plain),
        };
        let width = if emphasis == BlockEmphasis::Code {
            usize::MAX / 4
        } else {
            self.options.width.max(1) + self.options.left_padding
        };
        let mut lines = wrap_fragments(
            fragments,
            &format!("{padding}{first_prefix}"),
            &format!("{padding}{continuation_prefix}"),
            width,
        );

        let modifier = match emphasis {
            BlockEmphasis::Plain => None,
            BlockEmphasis::Heading => Some(Modifier::BOLD),
            BlockEmphasis::Code => Some(Modifier::DIM),
        };
        if let Some(modifier) = modifier {
            for line in &mut lines {
                for segment in &mut line.spans {
                    segment.style = segment.style.add_modifier(modifier);
                }
            }
        }
        self.consume_lines(lines);
    }

    /// The block containing `offset`, and whether the offset starts it.
    fn block_at(&self, offset: usize) -> Option<(&'a BlockLayout, bool)> {
        let blocks: &'a [BlockLayout] = self.options.blocks;
        blocks
            .iter()
            .find(|block| block.range.start <= offset && offset <= block.range.end)
            .map(|block| (block, block.range.start == offset))
    }

    fn consume_lines(&mut self, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            for event in output.events {
                let position = CursorVisualPosition {
                    line: self.current_line_index,
                    column: event.column,
                };
                if self.positions.len() <= event.offset {
                    self.positions.resize(event.offset + 1, None);
                }
                self.positions[event.offset] = Some((position, event.width));
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(
        mut self,
        marked: &MarkedDocument,
        suggestions: &[Suggestion],
        end_offset: usize,
    ) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        if self.positions.len() <= end_offset {
            self.positions.resize(end_offset + 1, None);
        }

        let mut positions = Vec::with_capacity(self.positions.len());
        let mut previous = CursorVisualPosition { line: 0, column: 0 };
        for cell in &self.positions {
            if let Some((position, _)) = cell {
                previous = *position;
            }
            positions.push(previous);
        }

        let mut hit_regions: Vec<HitRegion> = Vec::new();
        for segment in marked.segments() {
            let Some(id) = segment
                .suggestion
                .filter(|id| suggestions.iter().any(|suggestion| suggestion.id == *id))
            else {
                continue;
            };
            for offset in segment.range.start..segment.range.end {
                let Some(Some((position, width))) = self.positions.get(offset) else {
                    continue;
                };
                let end = position.column + (*width).max(1);
                match hit_regions.last_mut() {
                    Some(region) if region.suggestion == id && region.line == position.line => {
                        region.start_column = region.start_column.min(position.column);
                        region.end_column = region.end_column.max(end);
                    }
                    _ => hit_regions.push(HitRegion {
                        suggestion: id,
                        line: position.line,
                        start_column: position.column,
                        end_column: end,
                    }),
                }
            }
        }

        let cursor = self
            .options
            .cursor
            .and_then(|offset| positions.get(offset.min(end_offset)).copied());
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor,
            total_lines,
            positions,
            hit_regions,
        }
    }
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone)]
struct LineOutput {
    spans: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
}

#[derive(Clone, Copy)]
struct LocatedEvent {
    column: u16,
    offset: usize,
    width: u16,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

impl Fragment {
    /// Zero-width fragment that only records where `offset` lands.
    fn marker(offset: usize) -> Self {
        Self {
            text: String::new(),
            style: Style::default(),
            kind: FragmentKind::Word,
            width: 0,
            events: vec![TextEvent {
                column: 0,
                offset,
                width: 0,
            }],
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak { next_offset: usize },
}

/// A char offset pinned to a column inside its fragment.
#[derive(Clone, Copy)]
struct TextEvent {
    column: usize,
    offset: usize,
    width: u16,
}

fn tokenize_text(text: &str, base_offset: usize, style: Style, fragments: &mut Vec<FragmentItem>) {
    let mut builder: Option<TokenBuilder> = None;
    for (idx, ch) in text.chars().enumerate() {
        let offset = base_offset + idx;
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            let mut token = builder
                .take()
                .unwrap_or_else(|| TokenBuilder::new(style, false));
            token.mark(offset, 0);
            fragments.push(FragmentItem::Token(token.finish()));
            fragments.push(FragmentItem::LineBreak {
                next_offset: offset + 1,
            });
            continue;
        }

        let (expanded, count) = if ch == '\t' {
            (' ', TAB_WIDTH)
        } else {
            (ch, 1)
        };
        let is_whitespace = expanded.is_whitespace();
        let char_width = UnicodeWidthChar::width(expanded).unwrap_or(0) * count;

        let continues = builder
            .as_ref()
            .map(|existing| existing.kind_matches(is_whitespace))
            .unwrap_or(false);
        if !continues {
            if let Some(existing) = builder.take() {
                fragments.push(FragmentItem::Token(existing.finish()));
            }
            builder = Some(TokenBuilder::new(style, is_whitespace));
        }
        if let Some(current) = builder.as_mut() {
            current.mark(offset, char_width);
            for _ in 0..count {
                current.push_char(expanded);
            }
        }
    }

    if let Some(token) = builder {
        fragments.push(FragmentItem::Token(token.finish()));
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            events: Vec::new(),
        }
    }

    fn kind_matches(&self, is_whitespace: bool) -> bool {
        matches!(
            (self.kind, is_whitespace),
            (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
        )
    }

    fn mark(&mut self, offset: usize, width: usize) {
        self.events.push(TextEvent {
            column: self.width,
            offset,
            width: width as u16,
        });
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            events: self.events,
        }
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &str,
    continuation_prefix: &str,
    width: usize,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix);
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        let FragmentItem::Token(token) = fragment else {
            continue;
        };
        match token.kind {
            FragmentKind::Whitespace => pending_whitespace.push(token.clone()),
            FragmentKind::Word => {
                let whitespace_width: usize = pending_whitespace.iter().map(|item| item.width).sum();
                if token.width > 0
                    && builder.width > builder.prefix_width
                    && builder.width + whitespace_width + token.width > width
                {
                    builder.consume_pending(&mut pending_whitespace);
                    outputs.push(builder.build_line());
                    builder = LineBuilder::new(continuation_prefix);
                }
                builder.consume_pending(&mut pending_whitespace);
                builder.append_token(token.clone());
            }
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: &str) -> Self {
        let prefix_width = visible_width(prefix);
        let mut segments = Vec::new();
        if !prefix.is_empty() {
            segments.push(LineSegment {
                text: prefix.to_string(),
                style: Style::default(),
            });
        }
        Self {
            segments,
            events: Vec::new(),
            width: prefix_width,
            prefix_width,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        for event in &fragment.events {
            self.events.push(LocatedEvent {
                column: (start + event.column) as u16,
                offset: event.offset,
                width: event.width,
            });
        }
        if !fragment.text.is_empty() {
            self.width += fragment.width;
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            events: self.events,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
