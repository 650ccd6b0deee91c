use crate::draft::Draft;
use crate::ui::conversation::history::wrap_text;
use crate::ui::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const CURSOR: char = '▌';

/// Input control for the draft. Disabled while a query is outstanding.
pub struct Composer<'a> {
    draft: &'a Draft,
    placeholder: &'a str,
    theme: &'a Theme,
    enabled: bool,
}

impl<'a> Composer<'a> {
    pub fn new(draft: &'a Draft, placeholder: &'a str, theme: &'a Theme) -> Self {
        Self {
            draft,
            placeholder,
            theme,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn title(&self) -> &'static str {
        if self.enabled {
            " Ask · Enter to send, Shift+Enter for new line "
        } else {
            " Waiting for the answer · Esc to cancel "
        }
    }

    /// Draft wrapped to `width` with the cursor drawn in. When the draft is
    /// taller than `height`, the lowest window that still shows the cursor
    /// is kept.
    fn content_lines(&self, width: usize, height: usize) -> Vec<String> {
        let mut content = self.draft.as_str().to_string();
        if self.enabled {
            let at = content
                .char_indices()
                .nth(self.draft.cursor())
                .map(|(i, _)| i)
                .unwrap_or(content.len());
            content.insert(at, CURSOR);
        }

        let lines = wrap_text(&content, width);
        let cursor_line = lines
            .iter()
            .position(|line| line.contains(CURSOR))
            .unwrap_or(lines.len());
        let start = lines.len().saturating_sub(height).min(cursor_line);
        lines.into_iter().skip(start).take(height).collect()
    }
}

impl Widget for Composer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_style = if self.enabled {
            Style::default().fg(self.theme.accent)
        } else {
            self.theme.muted_style()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(self.title());

        let inner_area = block.inner(area);
        block.render(area, buf);

        if !self.enabled || self.draft.as_str().is_empty() {
            let text = if self.enabled { self.placeholder } else { "" };
            let placeholder_line = Line::from(vec![Span::styled(text, self.theme.muted_style())]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            if self.enabled {
                buf.set_line(
                    inner_area.x,
                    inner_area.y,
                    &Line::from(Span::styled("▌", Style::default().fg(self.theme.accent))),
                    1,
                );
            }
            return;
        }

        let lines = self.content_lines(inner_area.width as usize, inner_area.height as usize);
        for (i, line_text) in lines.iter().enumerate() {
            let line = Line::from(vec![Span::raw(line_text.as_str())]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(composer: Composer<'_>) -> String {
        let area = Rect::new(0, 0, 50, 4);
        let mut buf = Buffer::empty(area);
        composer.render(area, &mut buf);

        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buf.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_shows_placeholder_when_empty() {
        let theme = Theme::default();
        let draft = Draft::default();
        let text = render(Composer::new(&draft, "Type your query...", &theme));
        assert!(text.contains("ype your query..."));
        assert!(text.contains("Enter to send"));
    }

    #[test]
    fn test_shows_draft_with_cursor() {
        let theme = Theme::default();
        let draft = Draft::new("rainy");
        let text = render(Composer::new(&draft, "Type your query...", &theme));
        assert!(text.contains("rainy▌"));
        assert!(!text.contains("Type your query"));
    }

    #[test]
    fn test_disabled_hides_draft_and_placeholder() {
        let theme = Theme::default();
        let draft = Draft::new("leftover");
        let text = render(Composer::new(&draft, "Type your query...", &theme).enabled(false));
        assert!(text.contains("Esc to cancel"));
        assert!(!text.contains("leftover"));
        assert!(!text.contains("Type your query"));
    }

    #[test]
    fn test_tall_draft_keeps_last_lines() {
        let theme = Theme::default();
        let draft = Draft::new("one\ntwo\nthree\nfour");
        let composer = Composer::new(&draft, "", &theme);
        assert_eq!(composer.content_lines(20, 2), vec!["three", "four▌"]);
    }

    #[test]
    fn test_long_draft_wraps_with_cursor_visible() {
        let theme = Theme::default();
        let draft = Draft::new(
            "Show me accidents involving teenage drivers in rainy conditions that resulted in a fatality.",
        );
        let area = Rect::new(0, 0, 80, 5);
        let mut buf = Buffer::empty(area);
        Composer::new(&draft, "", &theme).render(area, &mut buf);

        let mut text = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                text.push_str(buf.get(x, y).symbol());
            }
            text.push('\n');
        }
        assert!(text.contains("that resulted"));
        assert!(text.contains("in a fatality.▌"));
    }

    #[test]
    fn test_cursor_line_stays_in_view() {
        let theme = Theme::default();
        let mut draft = Draft::new("one\ntwo\nthree\nfour");
        draft.apply_key(crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Home,
            crossterm::event::KeyModifiers::NONE,
        ));
        let composer = Composer::new(&draft, "", &theme);
        assert_eq!(composer.content_lines(20, 2), vec!["▌one", "two"]);
    }
}
