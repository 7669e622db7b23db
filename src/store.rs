use tracing::debug;

use crate::locator::{Locator, LocatorConfig};
use crate::markup::strip_annotation_tags;
use crate::suggestion::{ProposedEdit, Suggestion, SuggestionId, TextEdit, TextRange};
use crate::text::slice_chars;

/// Pending suggestions, kept sorted by range start and pairwise disjoint.
///
/// Ids are never reused, so an id that was removed or invalidated stays
/// unknown to the store for its whole lifetime.
#[derive(Debug, Default)]
pub struct SuggestionStore {
    locator: Locator,
    entries: Vec<Suggestion>,
    next_id: u64,
}

impl SuggestionStore {
    pub fn new(config: LocatorConfig) -> Self {
        Self {
            locator: Locator::new(config),
            entries: Vec::new(),
            next_id: 1,
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn add_all(&mut self, edits: &[ProposedEdit], text: &str) -> Vec<SuggestionId> {
        self.add_all_filtered(edits, text, |_| true)
    }

    /// Anchors `edits` against `text` in input order. Edits that cannot be
    /// located, that overlap an already anchored suggestion, or whose range
    /// `accept` refuses are skipped.
    pub fn add_all_filtered<F>(
        &mut self,
        edits: &[ProposedEdit],
        text: &str,
        mut accept: F,
    ) -> Vec<SuggestionId>
    where
        F: FnMut(TextRange) -> bool,
    {
        let mut added = Vec::new();
        let mut after = 0;
        for edit in edits {
            let Some(located) = self.locator.locate(text, &edit.original_text, after) else {
                debug!(original = %edit.original_text, "dropping edit that could not be located");
                continue;
            };
            if let Some(existing) = self
                .entries
                .iter()
                .find(|entry| entry.range.overlaps(&located.range))
            {
                debug!(
                    original = %edit.original_text,
                    range = %located.range,
                    conflicts_with = %existing.id,
                    "skipping overlapping edit"
                );
                continue;
            }
            if !accept(located.range) {
                debug!(range = %located.range, "document cannot edit range, skipping");
                continue;
            }
            let Some(anchored) = slice_chars(text, located.range) else {
                continue;
            };

            let id = SuggestionId(self.next_id.max(1));
            self.next_id = id.0 + 1;
            let suggestion = Suggestion {
                id,
                kind: edit.kind,
                range: located.range,
                original_text: anchored.to_string(),
                proposed_text: edit.original_text.clone(),
                replacement_text: strip_annotation_tags(&edit.replacement_text),
                explanation: edit.explanation.clone(),
                confidence: located.confidence,
            };
            self.insert_sorted(suggestion);
            after = located.range.end;
            added.push(id);
        }
        added
    }

    fn insert_sorted(&mut self, suggestion: Suggestion) {
        let idx = self
            .entries
            .partition_point(|entry| entry.range.start < suggestion.range.start);
        self.entries.insert(idx, suggestion);
    }

    pub fn remove(&mut self, id: SuggestionId) -> Option<Suggestion> {
        let idx = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(idx))
    }

    pub fn get(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains(&self, id: SuggestionId) -> bool {
        self.get(id).is_some()
    }

    /// Suggestion covering the char at `offset`, if any.
    pub fn at_offset(&self, offset: usize) -> Option<&Suggestion> {
        self.entries.iter().find(|entry| entry.range.contains(offset))
    }

    pub fn list(&self) -> &[Suggestion] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<SuggestionId> {
        self.entries.iter().map(|entry| entry.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) -> Vec<SuggestionId> {
        self.entries.drain(..).map(|entry| entry.id).collect()
    }

    /// Drops suggestions the edit touched, shifts those after it and then
    /// verifies every survivor still spells its original text in
    /// `new_text`. Returns the ids that were dropped.
    pub fn revalidate_after_edit(&mut self, edit: TextEdit, new_text: &str) -> Vec<SuggestionId> {
        if edit.is_noop() {
            return Vec::new();
        }
        let mut invalidated = Vec::new();
        let delta = edit.delta();
        let edited = edit.range;
        self.entries.retain_mut(|entry| {
            let touched = if edited.is_empty() {
                entry.range.start < edited.start && edited.start < entry.range.end
            } else {
                entry.range.overlaps(&edited)
            };
            if touched {
                debug!(id = %entry.id, edit = %edited, "edit touched suggestion");
                invalidated.push(entry.id);
                return false;
            }
            if entry.range.start >= edited.end {
                entry.range = entry.range.shifted(delta);
            }
            if slice_chars(new_text, entry.range) != Some(entry.original_text.as_str()) {
                debug!(id = %entry.id, range = %entry.range, "suggestion no longer matches text");
                invalidated.push(entry.id);
                return false;
            }
            true
        });
        invalidated
    }
}
