use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::document::RangeableDocument;
use crate::error::OracleError;
use crate::interaction::{Decision, InteractionController, PointerEvent, PointerOutcome, Viewport};
use crate::locator::LocatorConfig;
use crate::render::{mark_segments, HitRegion, MarkedDocument};
use crate::store::SuggestionStore;
use crate::suggestion::{ProposedEdit, Suggestion, SuggestionId, SuggestionState, TextEdit, TextRange};

/// Identifies one check request. Only the ticket of the latest
/// `begin_check` call is honoured when results come back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckTicket {
    generation: u64,
    version: u64,
}

impl CheckTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Document version the request was issued against.
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The result replaced the pending suggestions with these ids.
    Applied(Vec<SuggestionId>),
    /// A newer check was started; the result was discarded.
    Stale,
}

/// A document together with the suggestions anchored in it.
///
/// Every mutation path runs revalidation before returning, so the store
/// never holds a range that disagrees with the document.
pub struct SuggestionSession<D> {
    document: D,
    store: SuggestionStore,
    interaction: InteractionController,
    states: HashMap<SuggestionId, SuggestionState>,
    generation: u64,
    in_flight: Option<u64>,
}

impl<D: RangeableDocument> SuggestionSession<D> {
    pub fn new(document: D) -> Self {
        Self::with_config(document, LocatorConfig::default())
    }

    pub fn with_config(document: D, config: LocatorConfig) -> Self {
        Self {
            document,
            store: SuggestionStore::new(config),
            interaction: InteractionController::new(),
            states: HashMap::new(),
            generation: 0,
            in_flight: None,
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn text(&self) -> String {
        self.document.text()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        self.store.list()
    }

    pub fn suggestion(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.store.get(id)
    }

    pub fn state(&self, id: SuggestionId) -> Option<SuggestionState> {
        self.states.get(&id).copied()
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn interaction_mut(&mut self) -> &mut InteractionController {
        &mut self.interaction
    }

    pub fn active(&self) -> Option<&Suggestion> {
        self.interaction.active().and_then(|id| self.store.get(id))
    }

    pub fn is_checking(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Segments of the current text with the pending suggestions marked.
    pub fn marked(&self) -> MarkedDocument {
        mark_segments(&self.document.text(), self.store.list())
    }

    /// Anchors `edits` against the current text without discarding the
    /// suggestions already pending.
    pub fn add_edits(&mut self, edits: &[ProposedEdit]) -> Vec<SuggestionId> {
        let text = self.document.text();
        let document = &self.document;
        let added = self
            .store
            .add_all_filtered(edits, &text, |range| document.can_replace(range));
        for id in &added {
            self.states.insert(*id, SuggestionState::Pending);
        }
        added
    }

    /// Replaces the suggestion's range with its replacement text. Returns
    /// false for an unknown id, or when the range no longer spells the
    /// text it was anchored to, in which case the suggestion is dropped.
    pub fn accept(&mut self, id: SuggestionId) -> bool {
        let Some(suggestion) = self.store.get(id).cloned() else {
            debug!(%id, "accept on unknown suggestion ignored");
            return false;
        };

        let current = self.document.slice(suggestion.range);
        if current.as_deref() != Some(suggestion.original_text.as_str()) {
            debug!(%id, range = %suggestion.range, "suggestion is stale, dropping instead of applying");
            self.store.remove(id);
            self.finish(id, SuggestionState::Invalidated);
            return false;
        }

        let Some(edit) = self
            .document
            .replace_range(suggestion.range, &suggestion.replacement_text)
        else {
            debug!(%id, range = %suggestion.range, "document refused replacement");
            self.store.remove(id);
            self.finish(id, SuggestionState::Invalidated);
            return false;
        };

        self.store.remove(id);
        self.finish(id, SuggestionState::Accepted);
        self.revalidate(edit);
        info!(%id, delta = edit.delta(), "applied suggestion");
        true
    }

    /// Drops the suggestion and leaves the text alone. Returns false for an
    /// unknown id.
    pub fn reject(&mut self, id: SuggestionId) -> bool {
        if self.store.remove(id).is_none() {
            debug!(%id, "reject on unknown suggestion ignored");
            return false;
        }
        self.finish(id, SuggestionState::Rejected);
        true
    }

    pub fn decide(&mut self, decision: Decision) -> bool {
        match decision {
            Decision::Accept(id) => self.accept(id),
            Decision::Reject(id) => self.reject(id),
        }
    }

    /// User edit: replaces `range` with `text` and revalidates.
    pub fn edit(&mut self, range: TextRange, text: &str) -> Option<TextEdit> {
        let edit = self.document.replace_range(range, text)?;
        self.revalidate(edit);
        Some(edit)
    }

    pub fn insert_char(&mut self, offset: usize, ch: char) -> Option<TextEdit> {
        let mut buffer = [0u8; 4];
        self.edit(TextRange::empty_at(offset), ch.encode_utf8(&mut buffer))
    }

    pub fn delete_range(&mut self, range: TextRange) -> Option<TextEdit> {
        if range.is_empty() {
            return None;
        }
        self.edit(range, "")
    }

    fn revalidate(&mut self, edit: TextEdit) {
        let text = self.document.text();
        for id in self.store.revalidate_after_edit(edit, &text) {
            self.finish(id, SuggestionState::Invalidated);
        }
    }

    /// Records a terminal state and drops the id from the interaction
    /// state if it was active.
    fn finish(&mut self, id: SuggestionId, state: SuggestionState) {
        self.interaction.clear_if(id);
        self.states.insert(id, state);
    }

    /// Starts a new check. Any ticket handed out before becomes stale.
    pub fn begin_check(&mut self) -> CheckTicket {
        self.generation += 1;
        self.in_flight = Some(self.generation);
        CheckTicket {
            generation: self.generation,
            version: self.document.version(),
        }
    }

    /// Delivers the oracle's answer for `ticket`.
    ///
    /// Results of stale tickets are discarded. An error leaves the current
    /// suggestions untouched and is handed back. A successful result is
    /// located against the text as it is now and replaces the pending
    /// suggestions.
    pub fn complete_check(
        &mut self,
        ticket: CheckTicket,
        result: Result<Vec<ProposedEdit>, OracleError>,
    ) -> Result<CheckOutcome, OracleError> {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "discarding result of superseded check"
            );
            return Ok(CheckOutcome::Stale);
        }
        self.in_flight = None;

        let edits = match result {
            Ok(edits) => edits,
            Err(err) => {
                warn!(error = %err, "writing check failed");
                return Err(err);
            }
        };

        self.interaction.clear();
        for id in self.store.clear() {
            self.states.insert(id, SuggestionState::Invalidated);
        }
        let proposed = edits.len();
        let added = self.add_edits(&edits);
        info!(
            proposed,
            anchored = added.len(),
            edited_since_request = self.document.version() != ticket.version,
            "check completed"
        );
        Ok(CheckOutcome::Applied(added))
    }

    /// Makes `id` the active suggestion. Returns false for an unknown id.
    pub fn activate(&mut self, id: SuggestionId) -> bool {
        if !self.store.contains(id) {
            return false;
        }
        if let Some(previous) = self.interaction.activate(id) {
            self.mark_pending(previous);
        }
        self.states.insert(id, SuggestionState::Active);
        true
    }

    pub fn dismiss(&mut self) {
        if let Some(previous) = self.interaction.clear() {
            self.mark_pending(previous);
        }
    }

    fn mark_pending(&mut self, id: SuggestionId) {
        if self.store.contains(id) {
            self.states.insert(id, SuggestionState::Pending);
        }
    }

    pub fn select_next(&mut self) -> Option<SuggestionId> {
        let previous = self.interaction.active();
        let next = self.interaction.select_next(&self.store.ids())?;
        self.sync_activation(previous, next);
        Some(next)
    }

    pub fn select_previous(&mut self) -> Option<SuggestionId> {
        let previous = self.interaction.active();
        let next = self.interaction.select_previous(&self.store.ids())?;
        self.sync_activation(previous, next);
        Some(next)
    }

    fn sync_activation(&mut self, previous: Option<SuggestionId>, next: SuggestionId) {
        if let Some(previous) = previous.filter(|previous| *previous != next) {
            self.mark_pending(previous);
        }
        self.states.insert(next, SuggestionState::Active);
    }

    /// Routes a pointer press through the interaction controller and
    /// commits any decision it produces.
    pub fn pointer_down(
        &mut self,
        event: PointerEvent,
        regions: &[HitRegion],
        viewport: &Viewport,
    ) -> PointerOutcome {
        let previous = self.interaction.active();
        let outcome = self.interaction.pointer_down(event, regions, viewport);
        match outcome {
            PointerOutcome::Activated(id) => {
                if self.store.contains(id) {
                    self.sync_activation(previous, id);
                } else {
                    self.interaction.clear_if(id);
                }
            }
            PointerOutcome::Decided(decision) => {
                self.decide(decision);
            }
            PointerOutcome::Dismissed => {
                if let Some(previous) = previous {
                    self.mark_pending(previous);
                }
            }
            PointerOutcome::Ignored => {}
        }
        outcome
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
