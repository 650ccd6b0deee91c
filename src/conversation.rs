//! Append-only conversation model

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use strum::{AsRefStr, Display};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Author {
    User,
    Bot,
}

/// What a message represents in the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// The greeting the conversation is seeded with
    Welcome,
    /// A question submitted by the user
    Query,
    /// An answer returned by the answer service
    Answer,
    /// A failure reported in place of an answer
    Error,
}

impl MessageKind {
    pub fn author(self) -> Author {
        match self {
            MessageKind::Query => Author::User,
            MessageKind::Welcome | MessageKind::Answer | MessageKind::Error => Author::Bot,
        }
    }
}

/// Identifier of a message, unique within one conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single entry in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    id: MessageId,
    kind: MessageKind,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn author(&self) -> Author {
        self.kind.author()
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_error(&self) -> bool {
        self.kind == MessageKind::Error
    }
}

/// Ordered, append-only list of messages.
///
/// Entries are never removed or edited. Ids come from a counter, so they
/// grow with insertion order.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    next_id: u64,
}

impl Conversation {
    /// Start a conversation seeded with the welcome message
    pub fn new(welcome_text: impl Into<String>) -> Self {
        let mut conversation = Self {
            messages: Vec::new(),
            next_id: 0,
        };
        conversation.append(MessageKind::Welcome, welcome_text.into());
        conversation
    }

    /// Append a message and return its id
    pub fn append(&mut self, kind: MessageKind, text: String) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(Message {
            id,
            kind,
            text,
            timestamp: Utc::now(),
        });
        id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
