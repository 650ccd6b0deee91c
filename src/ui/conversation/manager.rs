use crate::config::UiConfig;
use crate::controller::ConversationController;
use crate::events::{Action, Completion, Effect};
use crate::ui::conversation::{AnalyzingIndicator, Composer, Transcript, TranscriptView};
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    text::Line,
    widgets::Paragraph,
    Frame,
};
use std::time::Instant;

/// Lines moved per PageUp/PageDown
const SCROLL_STEP: usize = 5;

/// Actions that can be requested by the chat screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenAction {
    None,
    Exit,
}

/// The single chat screen: controller plus the view state around it
pub struct ChatScreen {
    controller: ConversationController,
    view: TranscriptView,
    theme: Theme,
    ui: UiConfig,
    awaiting_since: Option<Instant>,
}

impl ChatScreen {
    pub fn new(ui: UiConfig) -> Self {
        let mut controller = ConversationController::new(ui.welcome_text.clone());
        if let Some(draft) = &ui.initial_draft {
            controller.update_draft(draft.clone());
        }

        Self {
            controller,
            view: TranscriptView::default(),
            theme: Theme::from_config(&ui.theme),
            ui,
            awaiting_since: None,
        }
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn view(&self) -> &TranscriptView {
        &self.view
    }

    /// Handle key input. The returned effect must be handed to the dispatcher.
    pub fn handle_key(&mut self, key: KeyEvent) -> (ScreenAction, Effect) {
        if key.kind == KeyEventKind::Release {
            return (ScreenAction::None, Effect::None);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            let effect = self.dispatch(Action::Cancel);
            return (ScreenAction::Exit, effect);
        }

        match key.code {
            KeyCode::PageUp => {
                self.view.scroll_up(SCROLL_STEP);
                (ScreenAction::None, Effect::None)
            }
            KeyCode::PageDown => {
                self.view.scroll_down(SCROLL_STEP);
                (ScreenAction::None, Effect::None)
            }
            _ => (ScreenAction::None, self.dispatch(Action::Key(key))),
        }
    }

    /// Paste text at the draft cursor, if input is enabled
    pub fn paste(&mut self, text: &str) {
        self.dispatch(Action::Paste(text.to_string()));
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        self.dispatch(Action::Resolved(completion));
    }

    fn dispatch(&mut self, action: Action) -> Effect {
        let effect = self.controller.update(action);
        self.awaiting_since = match (self.controller.awaiting_response(), self.awaiting_since) {
            (true, Some(since)) => Some(since),
            (true, None) => Some(Instant::now()),
            (false, _) => None,
        };
        effect
    }

    /// Render the header, transcript, composer and footer
    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(5),    // Transcript
                Constraint::Length(5), // Composer
                Constraint::Length(1), // Footer
            ])
            .split(frame.size());

        let header = Paragraph::new(Line::from(format!(" {}", self.ui.title)))
            .style(self.theme.header_style());
        frame.render_widget(header, chunks[0]);

        let indicator = self
            .awaiting_since
            .map(|since| AnalyzingIndicator::new(&self.ui.indicator_text, since.elapsed()));
        self.view
            .sync(self.controller.messages().len(), indicator.is_some());
        let transcript = Transcript::new(self.controller.messages(), &self.theme).indicator(indicator);
        frame.render_stateful_widget(transcript, chunks[1], &mut self.view);

        let composer = Composer::new(self.controller.draft(), &self.ui.placeholder, &self.theme)
            .enabled(self.controller.input_enabled());
        frame.render_widget(composer, chunks[2]);

        let footer = Paragraph::new(Line::from(self.ui.footer.as_str()))
            .alignment(Alignment::Center)
            .style(self.theme.muted_style());
        frame.render_widget(footer, chunks[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::AnswerError;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen() -> ChatScreen {
        ChatScreen::new(UiConfig::default())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(screen: &mut ChatScreen, text: &str) {
        for c in text.chars() {
            screen.handle_key(press(KeyCode::Char(c)));
        }
    }

    fn draw(screen: &mut ChatScreen) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| screen.render(frame)).unwrap();

        let buf = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_initial_render() {
        let mut screen = screen();
        let text = draw(&mut screen);
        assert!(text.contains("FARS Conversational Query"));
        assert!(text.contains("Ask me anything about FARS accident data."));
        assert!(text.contains("Supported by the Fatality Analysis Reporting System"));
        assert!(!text.contains("Analyzing data"));
    }

    #[test]
    fn test_indicator_visible_only_while_awaiting() {
        let mut screen = screen();
        type_str(&mut screen, "fatal crashes");

        let (action, effect) = screen.handle_key(press(KeyCode::Enter));
        assert_eq!(action, ScreenAction::None);
        let Effect::Dispatch(pending) = effect else {
            panic!("expected dispatch");
        };

        let text = draw(&mut screen);
        assert!(text.contains("fatal crashes"));
        assert!(text.contains("Analyzing data"));
        assert!(text.contains("Esc to cancel"));

        screen.handle_completion(Completion {
            query: pending.id,
            outcome: Ok("ST_CASE 12345".to_string()),
        });
        let text = draw(&mut screen);
        assert!(!text.contains("Analyzing data"));
        assert!(text.contains("ST_CASE 12345"));
        assert!(text.contains("Enter to send"));
    }

    #[test]
    fn test_error_entry_is_rendered() {
        let mut screen = screen();
        type_str(&mut screen, "q");
        let (_, Effect::Dispatch(pending)) = screen.handle_key(press(KeyCode::Enter)) else {
            panic!("expected dispatch");
        };

        screen.handle_completion(Completion {
            query: pending.id,
            outcome: Err(AnswerError::Transport("connection refused".into())),
        });

        assert!(draw(&mut screen).contains("connection refused"));
        assert!(screen.controller().input_enabled());
    }

    #[test]
    fn test_paste_ignored_while_awaiting() {
        let mut screen = screen();
        screen.paste("pasted question");
        assert_eq!(screen.controller().draft().as_str(), "pasted question");

        screen.handle_key(press(KeyCode::Enter));
        screen.paste("more");
        assert_eq!(screen.controller().draft().as_str(), "");
    }

    #[test]
    fn test_paste_inserts_at_cursor() {
        let mut screen = screen();
        screen.paste("drivers");
        screen.handle_key(press(KeyCode::Home));
        screen.paste("teen\r\n");
        assert_eq!(screen.controller().draft().as_str(), "teen\ndrivers");
    }

    #[test]
    fn test_ctrl_c_exits_and_cancels() {
        let mut screen = screen();
        type_str(&mut screen, "q");
        screen.handle_key(press(KeyCode::Enter));

        let (action, effect) = screen.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(action, ScreenAction::Exit);
        assert!(matches!(effect, Effect::Abort(_)));
    }

    #[test]
    fn test_page_keys_scroll_until_transcript_changes() {
        let mut screen = screen();
        for i in 0..10 {
            type_str(&mut screen, &format!("question {}", i));
            let (_, Effect::Dispatch(pending)) = screen.handle_key(press(KeyCode::Enter)) else {
                panic!("expected dispatch");
            };
            screen.handle_completion(Completion {
                query: pending.id,
                outcome: Ok(format!("answer {}", i)),
            });
        }
        draw(&mut screen);

        screen.handle_key(press(KeyCode::PageUp));
        draw(&mut screen);
        assert!(!screen.view().is_following());

        type_str(&mut screen, "one more");
        screen.handle_key(press(KeyCode::Enter));
        draw(&mut screen);
        assert!(screen.view().is_following());
    }

    #[test]
    fn test_initial_draft_from_config() {
        let mut ui = UiConfig::default();
        ui.initial_draft = Some("Show me accidents in rainy conditions".to_string());
        let screen = ChatScreen::new(ui);
        assert_eq!(screen.controller().draft().as_str(), "Show me accidents in rainy conditions");
    }
}
