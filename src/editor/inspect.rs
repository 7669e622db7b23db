use tdoc::{ChecklistItem, Document, Paragraph, Span};

use super::{BlockEmphasis, BlockLayout, Layout, ParagraphPath, SpanPath, TextSegment};
use crate::suggestion::TextRange;

const QUOTE_MARKER: &str = "| ";
const BULLET_MARKER: &str = "• ";

pub(super) fn collect_layout(document: &Document) -> Layout {
    let mut builder = LayoutBuilder::default();
    for (idx, paragraph) in document.paragraphs.iter().enumerate() {
        let mut path = ParagraphPath::new_root(idx);
        collect_paragraph(paragraph, &mut path, "", "", &mut builder);
    }
    builder.layout
}

#[derive(Default)]
struct LayoutBuilder {
    layout: Layout,
    offset: usize,
}

impl LayoutBuilder {
    fn push_leaf(
        &mut self,
        spans: &[Span],
        path: &ParagraphPath,
        first_prefix: String,
        continuation_prefix: String,
        emphasis: BlockEmphasis,
    ) {
        if !self.layout.blocks.is_empty() {
            self.layout.text.push('\n');
            self.offset += 1;
        }
        let block = self.layout.blocks.len();
        let start = self.offset;
        for (index, span) in spans.iter().enumerate() {
            let mut span_path = SpanPath::new(vec![index]);
            self.collect_span(span, block, &mut span_path);
        }
        self.layout.blocks.push(BlockLayout {
            range: TextRange::new(start, self.offset),
            first_prefix,
            continuation_prefix,
            emphasis,
            path: path.clone(),
        });
    }

    fn collect_span(&mut self, span: &Span, block: usize, span_path: &mut SpanPath) {
        let len = span.text.chars().count();
        if len > 0 || span.children.is_empty() {
            self.layout.segments.push(TextSegment {
                block,
                span_path: span_path.clone(),
                start: self.offset,
                len,
            });
            self.layout.text.push_str(&span.text);
            self.offset += len;
        }
        for (child_index, child) in span.children.iter().enumerate() {
            span_path.push(child_index);
            self.collect_span(child, block, span_path);
            span_path.pop();
        }
    }
}

fn collect_paragraph(
    paragraph: &Paragraph,
    path: &mut ParagraphPath,
    first_prefix: &str,
    continuation_prefix: &str,
    builder: &mut LayoutBuilder,
) {
    let leaf = |builder: &mut LayoutBuilder, path: &ParagraphPath, emphasis| {
        builder.push_leaf(
            paragraph.content(),
            path,
            first_prefix.to_string(),
            continuation_prefix.to_string(),
            emphasis,
        );
    };

    match paragraph {
        Paragraph::Text { .. } => leaf(builder, path, BlockEmphasis::Plain),
        Paragraph::Header1 { .. } | Paragraph::Header2 { .. } | Paragraph::Header3 { .. } => {
            leaf(builder, path, BlockEmphasis::Heading)
        }
        Paragraph::CodeBlock { .. } => leaf(builder, path, BlockEmphasis::Code),
        Paragraph::Quote { children } => {
            let continuation = format!("{continuation_prefix}{QUOTE_MARKER}");
            for (idx, child) in children.iter().enumerate() {
                let first = if idx == 0 {
                    format!("{first_prefix}{QUOTE_MARKER}")
                } else {
                    continuation.clone()
                };
                path.push_child(idx);
                collect_paragraph(child, path, &first, &continuation, builder);
                path.pop();
            }
        }
        Paragraph::UnorderedList { entries } | Paragraph::OrderedList { entries } => {
            let ordered = matches!(paragraph, Paragraph::OrderedList { .. });
            for (entry_index, entry) in entries.iter().enumerate() {
                let marker = if ordered {
                    format!("{}. ", entry_index + 1)
                } else {
                    BULLET_MARKER.to_string()
                };
                let lead = if entry_index == 0 {
                    first_prefix
                } else {
                    continuation_prefix
                };
                let continuation = format!(
                    "{continuation_prefix}{}",
                    " ".repeat(marker.chars().count())
                );
                for (paragraph_index, child) in entry.iter().enumerate() {
                    let first = if paragraph_index == 0 {
                        format!("{lead}{marker}")
                    } else {
                        continuation.clone()
                    };
                    path.push_entry(entry_index, paragraph_index);
                    collect_paragraph(child, path, &first, &continuation, builder);
                    path.pop();
                }
            }
        }
        Paragraph::Checklist { items } => {
            for (item_index, item) in items.iter().enumerate() {
                let lead = if item_index == 0 {
                    first_prefix
                } else {
                    continuation_prefix
                };
                collect_checklist_item(item, path, vec![item_index], lead, continuation_prefix, builder);
            }
        }
    }
}

fn collect_checklist_item(
    item: &ChecklistItem,
    path: &mut ParagraphPath,
    indices: Vec<usize>,
    first_prefix: &str,
    continuation_prefix: &str,
    builder: &mut LayoutBuilder,
) {
    let marker = if item.checked { "[✓] " } else { "[ ] " };
    let continuation = format!("{continuation_prefix}    ");
    path.push_checklist_item(indices.clone());
    builder.push_leaf(
        &item.content,
        path,
        format!("{first_prefix}{marker}"),
        continuation.clone(),
        BlockEmphasis::Plain,
    );
    path.pop();

    for (child_index, child) in item.children.iter().enumerate() {
        let mut child_indices = indices.clone();
        child_indices.push(child_index);
        collect_checklist_item(child, path, child_indices, &continuation, &continuation, builder);
    }
}
