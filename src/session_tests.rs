use ratatui::layout::Rect;
use tdoc::{Document, Paragraph, Span};

use super::*;
use crate::document::PlainDocument;
use crate::editor::StructuredDocument;
use crate::suggestion::MatchConfidence;

fn session(text: &str) -> SuggestionSession<PlainDocument> {
    SuggestionSession::new(PlainDocument::new(text))
}

fn assert_disjoint(suggestions: &[Suggestion]) {
    for (idx, a) in suggestions.iter().enumerate() {
        for b in &suggestions[idx + 1..] {
            assert!(!a.range.overlaps(&b.range), "{} overlaps {}", a.range, b.range);
        }
    }
}

#[test]
fn accepting_replaces_text_and_removes_suggestion() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[ProposedEdit::grammar("is goes", "goes", "Double verb.")]);
    assert_eq!(ids.len(), 1);

    assert!(session.accept(ids[0]));
    assert_eq!(session.text(), "The cat goes to store.");
    assert!(session.suggestion(ids[0]).is_none());
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Accepted));
}

#[test]
fn drifted_text_is_found_fuzzily() {
    let mut session = session("Their  going to the park");
    let ids = session.add_edits(&[ProposedEdit::grammar("Their going", "They're going", "")]);
    let suggestion = session.suggestion(ids[0]).unwrap().clone();
    assert_eq!(suggestion.confidence, MatchConfidence::FuzzyMatch);
    assert_eq!(suggestion.range, TextRange::new(0, 12));
    assert_eq!(suggestion.original_text, "Their  going");

    assert!(session.accept(ids[0]));
    assert_eq!(session.text(), "They're going to the park");
}

#[test]
fn accepting_earlier_suggestion_shifts_later_one() {
    let mut session = session("Their dog is goes home and they was happy.");
    let ids = session.add_edits(&[
        ProposedEdit::grammar("is goes", "goes", ""),
        ProposedEdit::grammar("they was", "they were", ""),
    ]);
    assert_eq!(session.suggestion(ids[1]).unwrap().range, TextRange::new(27, 35));

    assert!(session.accept(ids[0]));
    let later = session.suggestion(ids[1]).unwrap();
    assert_eq!(later.range, TextRange::new(24, 32));
    assert_eq!(
        session.document().slice(later.range).as_deref(),
        Some("they was")
    );
    assert_eq!(session.state(ids[1]), Some(SuggestionState::Pending));

    assert!(session.accept(ids[1]));
    assert_eq!(session.text(), "Their dog goes home and they were happy.");
}

#[test]
fn rejecting_twice_is_a_noop() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[ProposedEdit::grammar("is goes", "goes", "")]);
    assert!(session.reject(ids[0]));
    assert!(!session.reject(ids[0]));
    assert!(!session.accept(ids[0]));
    assert_eq!(session.text(), "The cat is goes to store.");
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Rejected));
}

#[test]
fn unlocatable_edit_creates_nothing() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[ProposedEdit::word_choice("elephant parade", "circus", "")]);
    assert!(ids.is_empty());
    assert!(session.suggestions().is_empty());
}

#[test]
fn overlapping_edits_never_coexist() {
    let mut session = session("I has went to the the store yesterday.");
    session.add_edits(&[
        ProposedEdit::grammar("has went", "went", ""),
        ProposedEdit::grammar("I has", "I have", ""),
        ProposedEdit::grammar("the the", "the", ""),
        ProposedEdit::word_choice("the store", "the shop", ""),
    ]);
    let texts: Vec<_> = session
        .suggestions()
        .iter()
        .map(|suggestion| suggestion.original_text.as_str())
        .collect();
    assert_eq!(texts, vec!["has went", "the the"]);
    assert_disjoint(session.suggestions());

    session.add_edits(&[ProposedEdit::word_choice("went to", "walked to", "")]);
    assert_disjoint(session.suggestions());
}

#[test]
fn typing_inside_suggestion_invalidates_it() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[ProposedEdit::grammar("is goes", "goes", "")]);
    session.insert_char(10, 'x').unwrap();
    assert!(session.suggestions().is_empty());
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Invalidated));
    assert!(!session.accept(ids[0]));
}

#[test]
fn typing_before_suggestion_shifts_it() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[ProposedEdit::grammar("is goes", "goes", "")]);
    session.edit(TextRange::empty_at(0), "Oh, ").unwrap();
    session.delete_range(TextRange::new(0, 1)).unwrap();
    assert_eq!(session.suggestion(ids[0]).unwrap().range, TextRange::new(11, 18));
    assert!(session.accept(ids[0]));
    assert_eq!(session.text(), "h, The cat goes to store.");
}

#[test]
fn accept_and_reject_clear_the_active_suggestion() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[
        ProposedEdit::grammar("is goes", "goes", ""),
        ProposedEdit::word_choice("store", "the store", ""),
    ]);
    assert!(session.activate(ids[0]));
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Active));
    assert!(session.activate(ids[1]));
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Pending));

    assert!(session.reject(ids[1]));
    assert_eq!(session.interaction().active(), None);
    assert!(session.activate(ids[0]));
    assert!(session.accept(ids[0]));
    assert!(session.active().is_none());
}

#[test]
fn stale_check_results_are_discarded() {
    let mut session = session("The cat is goes to store.");
    let first = session.begin_check();
    let second = session.begin_check();
    let edits = vec![ProposedEdit::grammar("is goes", "goes", "")];

    let outcome = session.complete_check(first, Ok(edits.clone())).unwrap();
    assert_eq!(outcome, CheckOutcome::Stale);
    assert!(session.suggestions().is_empty());
    assert!(session.is_checking());

    let outcome = session.complete_check(second, Ok(edits)).unwrap();
    assert!(matches!(outcome, CheckOutcome::Applied(ref ids) if ids.len() == 1));
    assert!(!session.is_checking());
}

#[test]
fn failed_check_leaves_suggestions_untouched() {
    let mut session = session("The cat is goes to store.");
    let ticket = session.begin_check();
    session
        .complete_check(ticket, Ok(vec![ProposedEdit::grammar("is goes", "goes", "")]))
        .unwrap();

    let ticket = session.begin_check();
    let result = session.complete_check(ticket, Err(OracleError::Disconnected));
    assert!(matches!(result, Err(OracleError::Disconnected)));
    assert_eq!(session.suggestions().len(), 1);
}

#[test]
fn check_results_anchor_against_current_text() {
    let mut session = session("The cat is goes to store.");
    let ticket = session.begin_check();
    session.edit(TextRange::empty_at(0), "Well, ").unwrap();

    let outcome = session
        .complete_check(ticket, Ok(vec![ProposedEdit::grammar("is goes", "goes", "")]))
        .unwrap();
    let CheckOutcome::Applied(ids) = outcome else {
        panic!("expected applied outcome");
    };
    assert_eq!(session.suggestion(ids[0]).unwrap().range, TextRange::new(14, 21));
    assert!(session.accept(ids[0]));
    assert_eq!(session.text(), "Well, The cat goes to store.");
}

#[test]
fn new_check_supersedes_pending_suggestions() {
    let mut session = session("The cat is goes to store.");
    let old = session.add_edits(&[ProposedEdit::word_choice("store", "shop", "")]);
    let ticket = session.begin_check();
    session
        .complete_check(ticket, Ok(vec![ProposedEdit::grammar("is goes", "goes", "")]))
        .unwrap();
    assert_eq!(session.state(old[0]), Some(SuggestionState::Invalidated));
    assert_eq!(session.suggestions().len(), 1);
    assert_eq!(session.suggestions()[0].original_text, "is goes");
}

#[test]
fn structured_session_refuses_cross_paragraph_edits() {
    let document = Document::new().with_paragraphs(vec![
        Paragraph::new_text().with_content(vec![Span::new_text("Hello wrold")]),
        Paragraph::new_text().with_content(vec![Span::new_text("The cat is goes home.")]),
    ]);
    let mut session = SuggestionSession::new(StructuredDocument::new(document));
    let ids = session.add_edits(&[
        ProposedEdit::grammar("wrold\nThe", "world. The", ""),
        ProposedEdit::grammar("is goes", "goes", ""),
    ]);
    assert_eq!(ids.len(), 1);

    assert!(session.accept(ids[0]));
    assert_eq!(session.text(), "Hello wrold\nThe cat goes home.");
    let paragraphs = &session.document().document().paragraphs;
    assert_eq!(paragraphs.len(), 2);
    assert_eq!(paragraphs[1].content()[0].text, "The cat goes home.");
}

#[test]
fn marked_view_covers_whole_text() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[ProposedEdit::grammar("is goes", "goes", "")]);
    let marked = session.marked();
    assert_eq!(marked.plain_text(), session.text());
    assert_eq!(marked.suggestion_at(8), Some(ids[0]));
}

#[test]
fn pointer_presses_drive_states() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[ProposedEdit::grammar("is goes", "goes", "")]);
    let regions = [HitRegion {
        suggestion: ids[0],
        line: 0,
        start_column: 8,
        end_column: 15,
    }];
    let viewport = Viewport::new(Rect::new(0, 0, 80, 10), 0);

    let outcome = session.pointer_down(PointerEvent::new(9, 0), &regions, &viewport);
    assert_eq!(outcome, PointerOutcome::Activated(ids[0]));
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Active));

    let outcome = session.pointer_down(PointerEvent::new(70, 5), &regions, &viewport);
    assert_eq!(outcome, PointerOutcome::Dismissed);
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Pending));

    session.pointer_down(PointerEvent::new(9, 0), &regions, &viewport);
    let popover = session
        .interaction_mut()
        .layout_popover(&regions, &viewport, (40, 6))
        .unwrap();
    let apply = PointerEvent::new(popover.apply.x, popover.apply.y);
    assert_eq!(
        session.pointer_down(apply, &regions, &viewport),
        PointerOutcome::Decided(Decision::Accept(ids[0]))
    );
    assert_eq!(session.text(), "The cat goes to store.");
}

#[test]
fn keyboard_selection_walks_document_order() {
    let mut session = session("The cat is goes to store.");
    let ids = session.add_edits(&[
        ProposedEdit::word_choice("store", "shop", ""),
        ProposedEdit::grammar("is goes", "goes", ""),
    ]);
    assert_eq!(session.select_next(), Some(ids[1]));
    assert_eq!(session.select_next(), Some(ids[0]));
    assert_eq!(session.state(ids[1]), Some(SuggestionState::Pending));
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Active));
    session.dismiss();
    assert_eq!(session.state(ids[0]), Some(SuggestionState::Pending));
}
