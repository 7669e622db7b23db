use ratatui::style::{Color, Modifier, Style};

use crate::suggestion::SuggestionKind;

/// Colors used by the review screen.
#[derive(Clone, Debug)]
pub struct Theme {
    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the document title in the status bar
    pub title_color: Color,

    /// Underline color for grammar suggestions
    pub grammar_fg: Color,

    /// Background color for word-choice suggestions
    pub word_choice_bg: Color,

    /// Foreground color for word-choice suggestions
    pub word_choice_fg: Color,

    /// Background color for the suggestion the popover belongs to
    pub active_bg: Color,

    /// Foreground color for the popover body
    pub popover_fg: Color,

    /// Background color for the popover body
    pub popover_bg: Color,

    /// Color for the original text in the popover
    pub original_color: Color,

    /// Color for the replacement text in the popover
    pub replacement_color: Color,

    /// Foreground color for the selected popover button
    pub button_selected_fg: Color,

    /// Background color for the selected popover button
    pub button_selected_bg: Color,

    /// Color for the "checking" indicator
    pub pending_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            title_color: Color::LightYellow,
            grammar_fg: Color::LightRed,
            word_choice_bg: Color::LightYellow,
            word_choice_fg: Color::Black,
            active_bg: Color::LightBlue,
            popover_fg: Color::White,
            popover_bg: Color::Black,
            original_color: Color::Red,
            replacement_color: Color::Green,
            button_selected_fg: Color::White,
            button_selected_bg: Color::LightBlue,
            pending_color: Color::Yellow,
        }
    }
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style for text covered by a suggestion. Grammar issues are
    /// underlined, word choices highlighted; the active one gets a
    /// background on top.
    pub fn suggestion_style(&self, kind: SuggestionKind, active: bool) -> Style {
        let style = match kind {
            SuggestionKind::Grammar => Style::default()
                .fg(self.grammar_fg)
                .add_modifier(Modifier::UNDERLINED),
            SuggestionKind::WordChoice => Style::default()
                .fg(self.word_choice_fg)
                .bg(self.word_choice_bg),
        };
        if active {
            style.bg(self.active_bg).add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    pub fn title_style(&self) -> Style {
        Style::default().fg(self.title_color)
    }

    pub fn popover_style(&self) -> Style {
        Style::default().fg(self.popover_fg).bg(self.popover_bg)
    }

    pub fn original_style(&self) -> Style {
        Style::default()
            .fg(self.original_color)
            .add_modifier(Modifier::CROSSED_OUT)
    }

    pub fn replacement_style(&self) -> Style {
        Style::default()
            .fg(self.replacement_color)
            .add_modifier(Modifier::BOLD)
    }

    pub fn button_selected_style(&self) -> Style {
        Style::default()
            .fg(self.button_selected_fg)
            .bg(self.button_selected_bg)
    }

    pub fn pending_style(&self) -> Style {
        Style::default().fg(self.pending_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_visually_distinct() {
        let theme = Theme::default();
        let grammar = theme.suggestion_style(SuggestionKind::Grammar, false);
        let word_choice = theme.suggestion_style(SuggestionKind::WordChoice, false);
        assert!(grammar.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(word_choice.bg, Some(theme.word_choice_bg));
        assert_ne!(grammar, word_choice);
    }

    #[test]
    fn active_suggestion_gets_background() {
        let theme = Theme::default();
        let active = theme.suggestion_style(SuggestionKind::Grammar, true);
        assert_eq!(active.bg, Some(theme.active_bg));
        assert!(active.add_modifier.contains(Modifier::UNDERLINED));
    }
}
