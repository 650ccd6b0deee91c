//! The answer service boundary and its adapters

use crate::config::{AnswerConfig, BackendKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Ways an answer service call can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("no answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("could not reach the answer service: {0}")]
    Transport(String),

    #[error("answer service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable answer: {0}")]
    Malformed(String),

    #[error("the answer service returned an empty answer")]
    EmptyAnswer,

    #[error("the answer task failed: {0}")]
    Crashed(String),
}

impl AnswerError {
    /// Whether retrying the same query could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            AnswerError::Timeout(_) | AnswerError::Transport(_) => true,
            AnswerError::Status { status, .. } => *status >= 500,
            AnswerError::Malformed(_) | AnswerError::EmptyAnswer | AnswerError::Crashed(_) => false,
        }
    }
}

/// Maps a question to an answer, asynchronously.
///
/// `query` is always trimmed and non-empty.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn submit_query(&self, query: &str) -> Result<String, AnswerError>;
}

/// Returns a canned answer after a fixed delay
#[derive(Debug, Clone)]
pub struct SimulatedAnswerService {
    delay: Duration,
    answer: String,
}

impl SimulatedAnswerService {
    pub fn new(delay: Duration, answer: impl Into<String>) -> Self {
        Self {
            delay,
            answer: answer.into(),
        }
    }
}

#[async_trait]
impl AnswerService for SimulatedAnswerService {
    async fn submit_query(&self, query: &str) -> Result<String, AnswerError> {
        log::debug!("Simulating answer for {} chars", query.len());
        tokio::time::sleep(self.delay).await;
        Ok(self.answer.clone())
    }
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
}

/// Posts `{"question": ...}` to a backend and reads `{"answer": ...}`
#[derive(Clone)]
pub struct HttpAnswerService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnswerService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AnswerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnswerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    async fn submit_query(&self, query: &str) -> Result<String, AnswerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AskRequest { question: query })
            .send()
            .await
            .map_err(|e| AnswerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnswerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: AskResponse = response
            .json()
            .await
            .map_err(|e| AnswerError::Malformed(e.to_string()))?;
        Ok(body.answer)
    }
}

/// Build the configured answer service
pub fn from_config(config: &AnswerConfig) -> Result<Arc<dyn AnswerService>, AnswerError> {
    match config.backend {
        BackendKind::Simulated => Ok(Arc::new(SimulatedAnswerService::new(
            config.simulated_delay(),
            config.simulated_answer.clone(),
        ))),
        BackendKind::Http => Ok(Arc::new(HttpAnswerService::new(
            config.endpoint.clone(),
            config.timeout(),
        )?)),
    }
}
