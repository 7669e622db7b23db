use ratatui::text::Line;
use tdoc::{Document, Paragraph, Span as DocSpan};

use super::*;
use crate::document::RangeableDocument;
use crate::editor::StructuredDocument;
use crate::suggestion::{MatchConfidence, SuggestionKind};

fn suggestion(id: u64, start: usize, end: usize) -> Suggestion {
    Suggestion {
        id: SuggestionId(id),
        kind: SuggestionKind::Grammar,
        range: TextRange::new(start, end),
        original_text: String::new(),
        proposed_text: String::new(),
        replacement_text: String::new(),
        explanation: String::new(),
        confidence: MatchConfidence::ExactMatch,
    }
}

fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}

fn options<'a>(theme: &'a Theme, width: usize, blocks: &'a [BlockLayout]) -> RenderOptions<'a> {
    RenderOptions {
        width,
        left_padding: 0,
        cursor: None,
        active: None,
        blocks,
        theme,
    }
}

#[test]
fn segments_reproduce_text() {
    let text = "Ünïcode text with naïve words and café.";
    let cases: Vec<Vec<Suggestion>> = vec![
        vec![],
        vec![suggestion(1, 0, 7)],
        vec![suggestion(1, 34, 39)],
        vec![suggestion(1, 18, 23), suggestion(2, 23, 24), suggestion(3, 0, 1)],
        vec![suggestion(1, 0, 39)],
    ];
    for suggestions in cases {
        let marked = mark_segments(text, &suggestions);
        assert_eq!(marked.plain_text(), text);
        let mut expected_start = 0;
        for segment in marked.segments() {
            assert_eq!(segment.range.start, expected_start);
            assert!(!segment.text.is_empty());
            expected_start = segment.range.end;
        }
        assert_eq!(expected_start, text.chars().count());
    }
}

#[test]
fn segment_boundaries_match_suggestion_ranges() {
    let text = "The cat is goes to store.";
    let marked = mark_segments(text, &[suggestion(2, 19, 24), suggestion(1, 8, 15)]);
    let shape: Vec<_> = marked
        .segments()
        .iter()
        .map(|segment| (segment.text.as_str(), segment.suggestion))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("The cat ", None),
            ("is goes", Some(SuggestionId(1))),
            (" to ", None),
            ("store", Some(SuggestionId(2))),
            (".", None),
        ]
    );
    assert_eq!(marked.suggestion_at(9), Some(SuggestionId(1)));
    assert_eq!(marked.suggestion_at(16), None);
}

#[test]
fn overlapping_or_out_of_range_suggestions_stay_unmarked() {
    let text = "abcdefgh";
    let marked = mark_segments(
        text,
        &[suggestion(1, 2, 6), suggestion(2, 4, 8), suggestion(3, 6, 20)],
    );
    assert_eq!(marked.plain_text(), text);
    let ids: Vec<_> = marked
        .segments()
        .iter()
        .filter_map(|segment| segment.suggestion)
        .collect();
    assert_eq!(ids, vec![SuggestionId(2)]);
}

#[test]
fn empty_text_has_no_segments() {
    let marked = mark_segments("", &[suggestion(1, 0, 0)]);
    assert!(marked.segments().is_empty());
    assert_eq!(marked.plain_text(), "");
}

#[test]
fn hit_regions_cover_suggestion_cells() {
    let theme = Theme::default();
    let text = "The cat is goes to store.";
    let suggestions = [suggestion(1, 8, 15)];
    let marked = mark_segments(text, &suggestions);
    let mut opts = options(&theme, 80, &[]);
    opts.cursor = Some(5);
    let render = render_marked(&marked, &suggestions, &opts);

    assert_eq!(render.total_lines, 1);
    assert_eq!(line_text(&render.lines[0]), text);
    assert_eq!(
        render.hit_regions,
        vec![HitRegion {
            suggestion: SuggestionId(1),
            line: 0,
            start_column: 8,
            end_column: 15,
        }]
    );
    assert!(render.hit_regions[0].contains(0, 10));
    assert!(!render.hit_regions[0].contains(0, 15));
    assert_eq!(render.cursor, Some(CursorVisualPosition { line: 0, column: 5 }));
}

#[test]
fn wrapped_suggestion_gets_one_region_per_line() {
    let theme = Theme::default();
    let text = "aaaa bbbb cccc";
    let suggestions = [suggestion(7, 5, 14)];
    let marked = mark_segments(text, &suggestions);
    let render = render_marked(&marked, &suggestions, &options(&theme, 9, &[]));

    assert_eq!(render.total_lines, 2);
    assert_eq!(line_text(&render.lines[0]), "aaaa bbbb ");
    assert_eq!(line_text(&render.lines[1]), "cccc");
    let regions = &render.hit_regions;
    assert!(regions.iter().all(|region| region.suggestion == SuggestionId(7)));
    assert_eq!(regions.len(), 2);
    assert_eq!((regions[1].line, regions[1].start_column, regions[1].end_column), (1, 0, 4));
    assert_eq!(render.positions[10], CursorVisualPosition { line: 1, column: 0 });
    assert_eq!(render.offset_at(1, 2), Some(12));
    assert_eq!(render.offset_at(0, 50), Some(9));
}

#[test]
fn explicit_newlines_start_new_lines() {
    let theme = Theme::default();
    let marked = mark_segments("one\ntwo", &[]);
    let render = render_marked(&marked, &[], &options(&theme, 80, &[]));
    assert_eq!(render.total_lines, 2);
    assert_eq!(render.positions[3], CursorVisualPosition { line: 0, column: 3 });
    assert_eq!(render.positions[7], CursorVisualPosition { line: 1, column: 3 });
}

#[test]
fn structured_blocks_render_with_prefixes() {
    let theme = Theme::default();
    let entries = vec![
        vec![Paragraph::new_text().with_content(vec![DocSpan::new_text("One")])],
        vec![Paragraph::new_text().with_content(vec![DocSpan::new_text("Two")])],
    ];
    let doc = StructuredDocument::new(
        Document::new().with_paragraphs(vec![Paragraph::new_unordered_list().with_entries(entries)]),
    );
    let marked = mark_segments(&doc.text(), &[]);
    let render = render_marked(&marked, &[], &options(&theme, 80, doc.blocks()));

    let lines: Vec<_> = render.lines.iter().map(line_text).collect();
    assert_eq!(lines, vec!["• One", "• Two"]);
    assert_eq!(render.positions[0], CursorVisualPosition { line: 0, column: 2 });
    assert_eq!(render.positions[4], CursorVisualPosition { line: 1, column: 2 });
}

#[test]
fn segment_without_known_suggestion_renders_plain() {
    let theme = Theme::default();
    let text = "The cat is goes home.";
    let known = [suggestion(1, 8, 15)];
    let marked = mark_segments(text, &known);
    let render = render_marked(&marked, &[], &options(&theme, 80, &[]));

    assert_eq!(line_text(&render.lines[0]), text);
    assert!(
        render.lines[0]
            .spans
            .iter()
            .all(|span| span.style == Style::default())
    );
    assert!(render.hit_regions.is_empty());
}
