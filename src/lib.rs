//! Terminal chat front-end for asking questions about FARS accident data.
//!
//! [`controller::ConversationController`] owns the transcript and the input
//! lifecycle; [`dispatcher::QueryDispatcher`] runs the one outstanding
//! [`answer::AnswerService`] call; [`tui`] wires both to the terminal.

pub mod answer;
pub mod commands;
pub mod config;
pub mod controller;
pub mod conversation;
pub mod dispatcher;
pub mod draft;
pub mod events;
pub mod tui;
pub mod ui;

pub use answer::{AnswerError, AnswerService};
pub use controller::{ConversationController, Phase, SubmitRejected};
pub use conversation::{Author, Conversation, Message, MessageId, MessageKind};
pub use events::{Action, Completion, Effect, PendingQuery, QueryId};
