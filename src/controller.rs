//! Conversation controller: owns the transcript and the input lifecycle

use crate::answer::AnswerError;
use crate::conversation::{Conversation, Message, MessageId, MessageKind};
use crate::draft::{is_submit_gesture, Draft};
use crate::events::{Action, Completion, Effect, PendingQuery, QueryId};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use thiserror::Error;

/// Whether a query is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Awaiting { query: QueryId },
}

/// Why a submit was ignored. Never shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("draft is empty")]
    EmptyInput,
    #[error("a query is already awaiting its answer")]
    AlreadyAwaiting,
}

/// How a key press on the input control was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Submit gesture accepted; the newline must not be inserted
    Submitted(PendingQuery),
    /// Submit gesture swallowed without submitting
    Suppressed,
    /// Not a submit gesture
    Ignored,
}

/// Draft text and the request gate
#[derive(Debug, Clone)]
pub struct InteractionState {
    draft: Draft,
    phase: Phase,
}

/// Sole owner and writer of the conversation and interaction state
#[derive(Debug, Clone)]
pub struct ConversationController {
    conversation: Conversation,
    interaction: InteractionState,
}

impl ConversationController {
    pub fn new(welcome_text: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(welcome_text),
            interaction: InteractionState {
                draft: Draft::default(),
                phase: Phase::Idle,
            },
        }
    }

    /// Start with a pre-filled draft
    pub fn with_draft(mut self, draft: impl Into<String>) -> Self {
        self.interaction.draft.set(draft);
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn draft(&self) -> &Draft {
        &self.interaction.draft
    }

    pub fn phase(&self) -> Phase {
        self.interaction.phase
    }

    pub fn awaiting_response(&self) -> bool {
        matches!(self.interaction.phase, Phase::Awaiting { .. })
    }

    /// The input control accepts edits and submission only while idle
    pub fn input_enabled(&self) -> bool {
        !self.awaiting_response()
    }

    /// Reducer entry point
    pub fn update(&mut self, action: Action) -> Effect {
        match action {
            Action::UpdateDraft(text) => {
                self.update_draft(text);
                Effect::None
            }
            Action::Submit => self.submit().map(Effect::Dispatch).unwrap_or(Effect::None),
            Action::Key(key) => self.handle_key(key),
            Action::Paste(text) => {
                self.paste(&text);
                Effect::None
            }
            Action::Resolved(completion) => {
                self.resolve(completion);
                Effect::None
            }
            Action::Cancel => self.cancel().map(Effect::Abort).unwrap_or(Effect::None),
        }
    }

    /// Set the draft unconditionally
    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.interaction.draft.set(text);
    }

    /// Submit the draft, or silently do nothing if it is blank or a
    /// query is already outstanding
    pub fn submit(&mut self) -> Option<PendingQuery> {
        match self.try_submit() {
            Ok(pending) => Some(pending),
            Err(reason) => {
                log::debug!("Submit ignored: {}", reason);
                None
            }
        }
    }

    pub fn try_submit(&mut self) -> Result<PendingQuery, SubmitRejected> {
        if self.awaiting_response() {
            return Err(SubmitRejected::AlreadyAwaiting);
        }
        if self.interaction.draft.is_blank() {
            return Err(SubmitRejected::EmptyInput);
        }

        let text = self.interaction.draft.take().trim().to_string();
        let message = self.conversation.append(MessageKind::Query, text.clone());
        let id = QueryId::new();
        self.interaction.phase = Phase::Awaiting { query: id };

        log::info!("Submitted query {} as message {}", id, message);
        Ok(PendingQuery { id, text })
    }

    /// Insert pasted text at the draft cursor. Ignored while awaiting.
    pub fn paste(&mut self, text: &str) {
        if self.input_enabled() {
            self.interaction.draft.insert_str(text);
        }
    }

    /// Handle a key that may be a submit gesture
    pub fn on_key_commit(&mut self, key: KeyEvent) -> KeyOutcome {
        if !is_submit_gesture(&key) {
            return KeyOutcome::Ignored;
        }
        if self.awaiting_response() {
            return KeyOutcome::Suppressed;
        }
        match self.submit() {
            Some(pending) => KeyOutcome::Submitted(pending),
            None => KeyOutcome::Suppressed,
        }
    }

    /// Route a key press on the input control
    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        match self.on_key_commit(key) {
            KeyOutcome::Submitted(pending) => return Effect::Dispatch(pending),
            KeyOutcome::Suppressed => return Effect::None,
            KeyOutcome::Ignored => {}
        }

        if self.awaiting_response() {
            if key.code == KeyCode::Esc && key.kind == KeyEventKind::Press {
                return self.cancel().map(Effect::Abort).unwrap_or(Effect::None);
            }
            // Input is disabled until the answer arrives.
            return Effect::None;
        }

        self.interaction.draft.apply_key(key);
        Effect::None
    }

    /// Apply the outcome of a query. Returns the appended message, or `None`
    /// when the outcome belongs to a query that is no longer awaited.
    pub fn resolve(&mut self, completion: Completion) -> Option<MessageId> {
        let Completion { query, outcome } = completion;
        match self.interaction.phase {
            Phase::Awaiting { query: awaited } if awaited == query => {}
            _ => {
                log::debug!("Dropping stale outcome for query {}", query);
                return None;
            }
        }

        let outcome = outcome.and_then(|answer| {
            let answer = answer.trim().to_string();
            if answer.is_empty() {
                Err(AnswerError::EmptyAnswer)
            } else {
                Ok(answer)
            }
        });

        let id = match outcome {
            Ok(answer) => {
                log::info!("Query {} answered ({} chars)", query, answer.len());
                self.conversation.append(MessageKind::Answer, answer)
            }
            Err(error) => {
                log::warn!("Query {} failed: {}", query, error);
                self.conversation.append(MessageKind::Error, failure_text(&error))
            }
        };
        self.interaction.phase = Phase::Idle;
        Some(id)
    }

    /// Abandon the outstanding query without appending anything
    pub fn cancel(&mut self) -> Option<QueryId> {
        match self.interaction.phase {
            Phase::Awaiting { query } => {
                log::info!("Cancelled query {}", query);
                self.interaction.phase = Phase::Idle;
                Some(query)
            }
            Phase::Idle => None,
        }
    }
}

/// Transcript text for a failed query
pub fn failure_text(error: &AnswerError) -> String {
    match error {
        AnswerError::Timeout(_) => format!("Sorry, the answer took too long ({}). Please try again.", error),
        _ => format!("Sorry, I couldn't get an answer: {}.", error),
    }
}
