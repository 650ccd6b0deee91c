use crate::answer::AnswerError;
use crossterm::event::KeyEvent;
use std::fmt;
use uuid::Uuid;

/// Identifies one submitted query, so a late answer can be matched to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(Uuid);

impl QueryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form for logs
        let full = self.0.simple().to_string();
        write!(f, "{}", &full[..8])
    }
}

/// A query accepted by the controller and waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub id: QueryId,
    pub text: String,
}

/// What the answer service produced for a query
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub query: QueryId,
    pub outcome: Result<String, AnswerError>,
}

/// Inputs to the conversation controller
#[derive(Debug, Clone)]
pub enum Action {
    /// Replace the draft text
    UpdateDraft(String),

    /// Submit the current draft
    Submit,

    /// A key press on the input control
    Key(KeyEvent),

    /// Text pasted into the input control
    Paste(String),

    /// The answer service finished
    Resolved(Completion),

    /// Abandon the in-flight query
    Cancel,
}

/// Work the runtime must carry out after an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,

    /// Send this query to the answer service
    Dispatch(PendingQuery),

    /// Stop the task running this query
    Abort(QueryId),
}
