//! Conversation UI components for the chat screen

pub mod composer;
pub mod history;
pub mod manager;
pub mod streaming;

pub use composer::Composer;
pub use history::{Transcript, TranscriptView};
pub use manager::{ChatScreen, ScreenAction};
pub use streaming::AnalyzingIndicator;
