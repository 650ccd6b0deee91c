//! Terminal setup and the main event loop

use crate::answer::AnswerService;
use crate::config::Config;
use crate::dispatcher::{QueryDispatcher, RetryPolicy};
use crate::ui::conversation::{ChatScreen, ScreenAction};
use anyhow::{Context, Result};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

/// Redraw interval, drives the indicator animation
const TICK: Duration = Duration::from_millis(250);

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the chat screen until the user quits
pub async fn run(config: Config, service: Arc<dyn AnswerService>) -> Result<()> {
    install_panic_hook();
    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, config, service).await;
    restore_terminal()?;
    terminal.show_cursor().context("Failed to show cursor")?;
    result
}

async fn event_loop(terminal: &mut Tui, config: Config, service: Arc<dyn AnswerService>) -> Result<()> {
    let policy = RetryPolicy::from_config(&config.answer);
    let (mut dispatcher, mut completions) = QueryDispatcher::new(service, policy);
    let mut screen = ChatScreen::new(config.ui);
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK);

    log::info!("Chat screen started");
    loop {
        terminal
            .draw(|frame| screen.render(frame))
            .context("Failed to draw frame")?;

        tokio::select! {
            _ = ticker.tick() => {}
            Some(completion) = completions.recv() => {
                screen.handle_completion(completion);
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => {
                    let (action, effect) = screen.handle_key(key);
                    dispatcher.apply(effect);
                    if action == ScreenAction::Exit {
                        break;
                    }
                }
                Some(Ok(Event::Paste(text))) => screen.paste(&text),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal event"),
                None => break,
            },
        }
    }

    log::info!("Chat screen closed");
    Ok(())
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(io::stdout())).context("Failed to create terminal")
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste)
        .context("Failed to leave alternate screen")?;
    Ok(())
}

/// Leave the alternate screen before a panic message is printed
fn install_panic_hook() {
    let original = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore_terminal();
        original(info);
    }));
}
