//! Transcript display component

use crate::conversation::{Author, Message, MessageKind};
use crate::ui::conversation::streaming::AnalyzingIndicator;
use crate::ui::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, StatefulWidget, Widget},
};

/// Scroll position of the transcript, kept between frames
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptView {
    /// Lines scrolled up from the bottom; 0 follows the newest item
    offset_from_bottom: usize,
    /// Message count and indicator visibility at the last sync
    seen: Option<(usize, bool)>,
}

impl TranscriptView {
    /// Jump back to the newest item if the transcript or the indicator
    /// changed since the last call. Returns whether it jumped.
    pub fn sync(&mut self, message_count: usize, indicator_visible: bool) -> bool {
        let current = Some((message_count, indicator_visible));
        if self.seen == current {
            return false;
        }
        self.seen = current;
        self.offset_from_bottom = 0;
        true
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.offset_from_bottom = self.offset_from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset_from_bottom = self.offset_from_bottom.saturating_sub(lines);
    }

    pub fn offset_from_bottom(&self) -> usize {
        self.offset_from_bottom
    }

    pub fn is_following(&self) -> bool {
        self.offset_from_bottom == 0
    }

    /// First visible line for `total` lines in a window of `height`
    fn window_start(&mut self, total: usize, height: usize) -> usize {
        let max_offset = total.saturating_sub(height);
        self.offset_from_bottom = self.offset_from_bottom.min(max_offset);
        max_offset - self.offset_from_bottom
    }
}

/// Renders every message in order, plus the indicator while awaiting
pub struct Transcript<'a> {
    messages: &'a [Message],
    indicator: Option<AnalyzingIndicator<'a>>,
    theme: &'a Theme,
}

impl<'a> Transcript<'a> {
    pub fn new(messages: &'a [Message], theme: &'a Theme) -> Self {
        Self {
            messages,
            indicator: None,
            theme,
        }
    }

    pub fn indicator(mut self, indicator: Option<AnalyzingIndicator<'a>>) -> Self {
        self.indicator = indicator;
        self
    }

    /// All transcript lines for a given inner width
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for message in self.messages {
            lines.extend(self.render_message(message, width));
            lines.push(Line::from(""));
        }
        if let Some(indicator) = &self.indicator {
            lines.push(indicator.line(self.theme));
        }
        lines
    }

    fn render_message(&self, message: &Message, width: u16) -> Vec<Line<'static>> {
        let (label, alignment) = match message.author() {
            Author::User => ("👤 You", Alignment::Right),
            Author::Bot => ("🤖 FARS", Alignment::Left),
        };
        let timestamp = message.timestamp().format("%H:%M:%S").to_string();

        let mut lines = vec![Line::from(vec![Span::styled(
            format!("{} · {}", label, timestamp),
            self.theme.muted_style(),
        )])
        .alignment(alignment)];

        let style = self.content_style(message);
        for content_line in wrap_text(message.text(), width.saturating_sub(2) as usize) {
            lines.push(Line::from(vec![Span::styled(content_line, style)]).alignment(alignment));
        }
        lines
    }

    fn content_style(&self, message: &Message) -> Style {
        match message.kind() {
            MessageKind::Query => Style::default().fg(self.theme.user),
            MessageKind::Error => Style::default()
                .fg(self.theme.error)
                .add_modifier(Modifier::BOLD),
            MessageKind::Welcome | MessageKind::Answer => Style::default().fg(self.theme.bot),
        }
    }
}

impl StatefulWidget for Transcript<'_> {
    type State = TranscriptView;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.muted_style())
            .title("💬 Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        let lines = self.lines(inner_area.width);
        let height = inner_area.height as usize;
        let start = state.window_start(lines.len(), height);

        for (i, line) in lines.iter().skip(start).take(height).enumerate() {
            let indent = match line.alignment {
                Some(Alignment::Right) => inner_area.width.saturating_sub(line.width() as u16),
                _ => 0,
            };
            buf.set_line(
                inner_area.x + indent,
                inner_area.y + i as u16,
                line,
                inner_area.width - indent,
            );
        }
    }
}

/// Wrap text to fit within the given width, keeping explicit line breaks
/// and the spacing inside a line. Spacing at a wrap point is dropped and
/// words wider than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for token in tokens(paragraph) {
            let token_width = token.chars().count();
            if current_width + token_width <= width {
                current_line.push_str(token);
                current_width += token_width;
                continue;
            }

            if current_width > 0 {
                lines.push(std::mem::take(&mut current_line).trim_end().to_string());
                current_width = 0;
            }
            if token.starts_with(char::is_whitespace) {
                continue;
            }

            let chars: Vec<char> = token.chars().collect();
            let mut chunks = chars.chunks(width).peekable();
            while let Some(chunk) = chunks.next() {
                if chunks.peek().is_some() {
                    lines.push(chunk.iter().collect());
                } else {
                    current_line = chunk.iter().collect();
                    current_width = chunk.len();
                }
            }
        }

        lines.push(current_line);
    }

    lines
}

/// Alternating runs of whitespace and non-whitespace
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let space = rest.chars().next()?.is_whitespace();
        let end = rest
            .find(|c: char| c.is_whitespace() != space)
            .unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        rest = tail;
        Some(token)
    })
}
