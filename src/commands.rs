use crate::answer::AnswerService;
use crate::config::Config;
use crate::controller::ConversationController;
use crate::conversation::Message;
use crate::dispatcher::{QueryDispatcher, RetryPolicy};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Result of a one-shot question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    Answered,
    Failed,
    EmptyQuestion,
}

impl AskOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            AskOutcome::Answered => 0,
            AskOutcome::Failed => 1,
            AskOutcome::EmptyQuestion => 2,
        }
    }
}

/// Ask a single question through the same controller the chat screen uses
/// and return the finished transcript
pub async fn ask(
    question: &str,
    config: &Config,
    service: Arc<dyn AnswerService>,
) -> Result<(AskOutcome, ConversationController)> {
    let mut controller = ConversationController::new(config.ui.welcome_text.clone());
    controller.update_draft(question);

    let Some(pending) = controller.submit() else {
        return Ok((AskOutcome::EmptyQuestion, controller));
    };

    let (mut dispatcher, mut completions) =
        QueryDispatcher::new(service, RetryPolicy::from_config(&config.answer));
    dispatcher.dispatch(pending);

    let completion = completions
        .recv()
        .await
        .context("Answer task ended without reporting")?;
    controller.resolve(completion);

    let outcome = match controller.messages().last() {
        Some(message) if message.is_error() => AskOutcome::Failed,
        _ => AskOutcome::Answered,
    };
    Ok((outcome, controller))
}

/// Format a message as `[HH:MM:SS] author> text`
pub fn transcript_line(message: &Message) -> String {
    format!(
        "[{}] {}> {}",
        message.timestamp().format("%H:%M:%S"),
        message.author(),
        message.text()
    )
}

pub fn print_transcript(controller: &ConversationController) {
    for message in controller.messages() {
        println!("{}", transcript_line(message));
    }
}

/// The transcript as a JSON array of messages
pub fn transcript_json(controller: &ConversationController) -> Result<String> {
    serde_json::to_string_pretty(controller.messages()).context("Failed to serialize transcript")
}

/// Write the default configuration, refusing to overwrite an existing file
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Config already exists at {} (use --force to overwrite)", path.display());
        return Ok(());
    }

    Config::default().save(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
