use crate::ui::theme::Theme;
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use std::time::Duration;

/// Cycle period of the dots, one step every half second
const DOT_STEP: Duration = Duration::from_millis(500);

/// Ephemeral "analyzing" line shown while a query is outstanding
#[derive(Debug, Clone)]
pub struct AnalyzingIndicator<'a> {
    text: &'a str,
    elapsed: Duration,
}

impl<'a> AnalyzingIndicator<'a> {
    pub fn new(text: &'a str, elapsed: Duration) -> Self {
        Self { text, elapsed }
    }

    pub fn line(&self, theme: &Theme) -> Line<'static> {
        Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(theme.bot)),
            Span::styled(
                self.text.to_string(),
                Style::default().fg(theme.bot).add_modifier(Modifier::ITALIC),
            ),
            Span::styled(dots(self.elapsed), Style::default().fg(theme.accent)),
        ])
    }
}

/// One to three dots, advancing with elapsed time
pub fn dots(elapsed: Duration) -> &'static str {
    match (elapsed.as_millis() / DOT_STEP.as_millis()) % 3 {
        0 => ".",
        1 => "..",
        _ => "...",
    }
}
