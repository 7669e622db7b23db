use ratatui::layout::Rect;

use crate::render::HitRegion;
use crate::suggestion::SuggestionId;

pub const APPLY_LABEL: &str = "[ Apply ]";
pub const IGNORE_LABEL: &str = "[ Ignore ]";
const BUTTON_GAP: u16 = 2;

/// Default popover size in cells.
pub const POPOVER_WIDTH: u16 = 44;
pub const POPOVER_HEIGHT: u16 = 7;
/// Cells kept free between the popover and the viewport's left and right
/// edges when the viewport is wide enough.
pub const POPOVER_MARGIN: u16 = 1;

/// A pointer press in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerEvent {
    pub column: u16,
    pub row: u16,
}

impl PointerEvent {
    pub fn new(column: u16, row: u16) -> Self {
        Self { column, row }
    }
}

/// Where rendered text lines land on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub area: Rect,
    /// Index of the rendered line shown in the first row of `area`.
    pub scroll_top: usize,
}

impl Viewport {
    pub fn new(area: Rect, scroll_top: usize) -> Self {
        Self { area, scroll_top }
    }

    /// Rendered `(line, column)` under a screen cell.
    pub fn to_text(&self, event: PointerEvent) -> Option<(usize, u16)> {
        if !contains(self.area, event.column, event.row) {
            return None;
        }
        let line = self.scroll_top + usize::from(event.row - self.area.y);
        Some((line, event.column - self.area.x))
    }

    /// Screen rectangle of a hit region, or `None` when it is scrolled out.
    pub fn to_screen(&self, region: &HitRegion) -> Option<Rect> {
        let row = region.line.checked_sub(self.scroll_top)?;
        if row >= usize::from(self.area.height) {
            return None;
        }
        let x = self.area.x.saturating_add(region.start_column);
        let right = self
            .area
            .right()
            .min(self.area.x.saturating_add(region.end_column));
        Some(Rect {
            x: x.min(self.area.right()),
            y: self.area.y + row as u16,
            width: right.saturating_sub(x),
            height: 1,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Accept(SuggestionId),
    Reject(SuggestionId),
}

impl Decision {
    pub fn suggestion(self) -> SuggestionId {
        match self {
            Decision::Accept(id) | Decision::Reject(id) => id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    /// A highlight was clicked and is now the active suggestion.
    Activated(SuggestionId),
    /// One of the popover buttons was clicked.
    Decided(Decision),
    /// The click landed outside every highlight and the popover.
    Dismissed,
    /// Nothing changed.
    Ignored,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PopoverButton {
    #[default]
    Apply,
    Ignore,
}

/// The popover as last drawn: its frame and the two button cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PopoverLayout {
    pub suggestion: SuggestionId,
    pub area: Rect,
    pub apply: Rect,
    pub ignore: Rect,
}

impl PopoverLayout {
    pub fn new(suggestion: SuggestionId, area: Rect) -> Self {
        // Buttons sit on the last row inside the border.
        let row = area.bottom().saturating_sub(2).max(area.y);
        let inner_right = area.right().saturating_sub(1);
        let apply_x = (area.x + 2).min(inner_right);
        let apply_width = (APPLY_LABEL.len() as u16).min(inner_right - apply_x);
        let ignore_x = (apply_x + apply_width + BUTTON_GAP).min(inner_right);
        let ignore_width = (IGNORE_LABEL.len() as u16).min(inner_right - ignore_x);
        Self {
            suggestion,
            area,
            apply: Rect::new(apply_x, row, apply_width, 1),
            ignore: Rect::new(ignore_x, row, ignore_width, 1),
        }
    }
}

/// Places a popover of `size` (width, height) next to `anchor`.
///
/// The popover goes below the anchor when it fits, above it otherwise, and
/// is finally clamped so it never leaves `viewport`.
pub fn popover_area(anchor: Rect, size: (u16, u16), viewport: Rect) -> Rect {
    let width = size.0.min(viewport.width);
    let height = size.1.min(viewport.height);

    let (min_x, max_x) = if width + 2 * POPOVER_MARGIN <= viewport.width {
        (
            viewport.x + POPOVER_MARGIN,
            viewport.right() - width - POPOVER_MARGIN,
        )
    } else {
        (viewport.x, viewport.right() - width)
    };
    let x = anchor.x.clamp(min_x, max_x);

    let below = anchor.bottom();
    let y = if below + height <= viewport.bottom() {
        below
    } else if anchor.y >= viewport.y + height {
        anchor.y - height
    } else {
        viewport.bottom() - height
    };

    Rect::new(x, y.max(viewport.y), width, height)
}

/// Tracks which suggestion is presented for a decision. At most one is
/// active at a time.
#[derive(Debug, Default)]
pub struct InteractionController {
    active: Option<SuggestionId>,
    popover: Option<PopoverLayout>,
    button: PopoverButton,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<SuggestionId> {
        self.active
    }

    pub fn popover(&self) -> Option<&PopoverLayout> {
        self.popover.as_ref()
    }

    pub fn selected_button(&self) -> PopoverButton {
        self.button
    }

    /// Makes `id` the active suggestion, replacing any previous one.
    /// Returns the suggestion that was active before.
    pub fn activate(&mut self, id: SuggestionId) -> Option<SuggestionId> {
        let previous = self.active.replace(id);
        if previous != Some(id) {
            self.popover = None;
            self.button = PopoverButton::Apply;
        }
        previous.filter(|previous| *previous != id)
    }

    pub fn clear(&mut self) -> Option<SuggestionId> {
        self.popover = None;
        self.button = PopoverButton::Apply;
        self.active.take()
    }

    /// Clears the active suggestion only if it is `id`.
    pub fn clear_if(&mut self, id: SuggestionId) -> bool {
        if self.active == Some(id) {
            self.clear();
            true
        } else {
            false
        }
    }

    /// Computes and remembers the popover for the active suggestion. The
    /// popover is anchored to the first visible cell run of the suggestion.
    pub fn layout_popover(
        &mut self,
        regions: &[HitRegion],
        viewport: &Viewport,
        size: (u16, u16),
    ) -> Option<PopoverLayout> {
        let id = self.active?;
        let anchor = regions
            .iter()
            .filter(|region| region.suggestion == id)
            .find_map(|region| viewport.to_screen(region));
        self.popover = anchor.map(|anchor| {
            PopoverLayout::new(id, popover_area(anchor, size, viewport.area))
        });
        self.popover
    }

    pub fn pointer_down(
        &mut self,
        event: PointerEvent,
        regions: &[HitRegion],
        viewport: &Viewport,
    ) -> PointerOutcome {
        if let Some(popover) = self.popover {
            if contains(popover.apply, event.column, event.row) {
                return PointerOutcome::Decided(Decision::Accept(popover.suggestion));
            }
            if contains(popover.ignore, event.column, event.row) {
                return PointerOutcome::Decided(Decision::Reject(popover.suggestion));
            }
            if contains(popover.area, event.column, event.row) {
                return PointerOutcome::Ignored;
            }
        }

        let hit = viewport.to_text(event).and_then(|(line, column)| {
            regions
                .iter()
                .find(|region| region.contains(line, column))
                .map(|region| region.suggestion)
        });
        match hit {
            Some(id) => {
                self.activate(id);
                PointerOutcome::Activated(id)
            }
            None if self.active.is_some() => {
                self.clear();
                PointerOutcome::Dismissed
            }
            None => PointerOutcome::Ignored,
        }
    }

    /// Activates the suggestion after the active one in `ordered`,
    /// wrapping around. Starts at the first when nothing is active.
    pub fn select_next(&mut self, ordered: &[SuggestionId]) -> Option<SuggestionId> {
        let next = match self.position_in(ordered) {
            Some(idx) => ordered.get((idx + 1) % ordered.len()),
            None => ordered.first(),
        }
        .copied()?;
        self.activate(next);
        Some(next)
    }

    pub fn select_previous(&mut self, ordered: &[SuggestionId]) -> Option<SuggestionId> {
        let previous = match self.position_in(ordered) {
            Some(idx) => ordered.get((idx + ordered.len() - 1) % ordered.len()),
            None => ordered.last(),
        }
        .copied()?;
        self.activate(previous);
        Some(previous)
    }

    fn position_in(&self, ordered: &[SuggestionId]) -> Option<usize> {
        let active = self.active?;
        ordered.iter().position(|id| *id == active)
    }

    pub fn toggle_button(&mut self) {
        self.button = match self.button {
            PopoverButton::Apply => PopoverButton::Ignore,
            PopoverButton::Ignore => PopoverButton::Apply,
        };
    }

    /// Decision for the currently selected popover button.
    pub fn confirm(&self) -> Option<Decision> {
        let id = self.active?;
        Some(match self.button {
            PopoverButton::Apply => Decision::Accept(id),
            PopoverButton::Ignore => Decision::Reject(id),
        })
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x && column < rect.right() && row >= rect.y && row < rect.bottom()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: u64, line: usize, start: u16, end: u16) -> HitRegion {
        HitRegion {
            suggestion: SuggestionId(id),
            line,
            start_column: start,
            end_column: end,
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(Rect::new(0, 1, 80, 20), 0)
    }

    #[test]
    fn popover_goes_below_anchor() {
        let area = popover_area(Rect::new(10, 3, 5, 1), (30, 5), Rect::new(0, 0, 80, 24));
        assert_eq!(area, Rect::new(10, 4, 30, 5));
    }

    #[test]
    fn popover_flips_above_near_bottom() {
        let area = popover_area(Rect::new(10, 21, 5, 1), (30, 5), Rect::new(0, 0, 80, 24));
        assert_eq!(area, Rect::new(10, 16, 30, 5));
    }

    #[test]
    fn popover_is_clamped_to_viewport() {
        let viewport = Rect::new(0, 0, 40, 6);
        let area = popover_area(Rect::new(35, 2, 5, 1), (30, 5), viewport);
        assert_eq!(area, Rect::new(9, 1, 30, 5));

        let tiny = popover_area(Rect::new(3, 1, 2, 1), (30, 5), Rect::new(0, 0, 20, 3));
        assert_eq!(tiny, Rect::new(0, 0, 20, 3));
    }

    #[test]
    fn clicking_highlight_activates_it() {
        let mut controller = InteractionController::new();
        let regions = [region(1, 0, 4, 9), region(2, 2, 0, 3)];
        let outcome = controller.pointer_down(PointerEvent::new(5, 1), &regions, &viewport());
        assert_eq!(outcome, PointerOutcome::Activated(SuggestionId(1)));

        let outcome = controller.pointer_down(PointerEvent::new(1, 3), &regions, &viewport());
        assert_eq!(outcome, PointerOutcome::Activated(SuggestionId(2)));
        assert_eq!(controller.active(), Some(SuggestionId(2)));
    }

    #[test]
    fn clicking_elsewhere_dismisses() {
        let mut controller = InteractionController::new();
        let regions = [region(1, 0, 4, 9)];
        assert_eq!(
            controller.pointer_down(PointerEvent::new(50, 10), &regions, &viewport()),
            PointerOutcome::Ignored
        );
        controller.activate(SuggestionId(1));
        assert_eq!(
            controller.pointer_down(PointerEvent::new(50, 10), &regions, &viewport()),
            PointerOutcome::Dismissed
        );
        assert_eq!(controller.active(), None);
    }

    #[test]
    fn popover_buttons_produce_decisions() {
        let mut controller = InteractionController::new();
        let regions = [region(3, 0, 4, 9)];
        let view = viewport();
        controller.activate(SuggestionId(3));
        let popover = controller
            .layout_popover(&regions, &view, (POPOVER_WIDTH, POPOVER_HEIGHT))
            .unwrap();
        assert_eq!(popover.area.y, 2);

        let apply = PointerEvent::new(popover.apply.x, popover.apply.y);
        assert_eq!(
            controller.pointer_down(apply, &regions, &view),
            PointerOutcome::Decided(Decision::Accept(SuggestionId(3)))
        );
        let ignore = PointerEvent::new(popover.ignore.x + 1, popover.ignore.y);
        assert_eq!(
            controller.pointer_down(ignore, &regions, &view),
            PointerOutcome::Decided(Decision::Reject(SuggestionId(3)))
        );
        let body = PointerEvent::new(popover.area.x + 1, popover.area.y + 1);
        assert_eq!(controller.pointer_down(body, &regions, &view), PointerOutcome::Ignored);
        assert_eq!(controller.active(), Some(SuggestionId(3)));
    }

    #[test]
    fn scrolled_out_suggestion_has_no_popover() {
        let mut controller = InteractionController::new();
        controller.activate(SuggestionId(1));
        let scrolled = Viewport::new(Rect::new(0, 1, 80, 20), 5);
        let regions = [region(1, 0, 4, 9)];
        assert!(controller.layout_popover(&regions, &scrolled, (30, 5)).is_none());
    }

    #[test]
    fn keyboard_selection_cycles_in_order() {
        let mut controller = InteractionController::new();
        let ids = [SuggestionId(4), SuggestionId(7), SuggestionId(9)];
        assert_eq!(controller.select_next(&ids), Some(SuggestionId(4)));
        assert_eq!(controller.select_next(&ids), Some(SuggestionId(7)));
        assert_eq!(controller.select_previous(&ids), Some(SuggestionId(4)));
        assert_eq!(controller.select_previous(&ids), Some(SuggestionId(9)));
        assert_eq!(controller.select_next(&[]), None);
    }

    #[test]
    fn confirm_follows_selected_button() {
        let mut controller = InteractionController::new();
        assert_eq!(controller.confirm(), None);
        controller.activate(SuggestionId(2));
        assert_eq!(controller.confirm(), Some(Decision::Accept(SuggestionId(2))));
        controller.toggle_button();
        assert_eq!(controller.confirm(), Some(Decision::Reject(SuggestionId(2))));
        assert!(controller.clear_if(SuggestionId(2)));
        assert!(!controller.clear_if(SuggestionId(2)));
    }
}
