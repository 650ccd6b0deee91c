//! Runs answer service calls as tokio tasks, one at a time

use crate::answer::{AnswerError, AnswerService};
use crate::config::AnswerConfig;
use crate::events::{Completion, Effect, PendingQuery, QueryId};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Deadline and retry settings for a single query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AnswerConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AnswerConfig::default())
    }
}

struct InFlight {
    query: QueryId,
    handle: JoinHandle<()>,
}

/// Owner of the in-flight answer service task.
///
/// Outcomes are delivered on the channel returned by [`QueryDispatcher::new`].
/// Dropping the dispatcher aborts whatever is still running.
pub struct QueryDispatcher {
    service: Arc<dyn AnswerService>,
    policy: RetryPolicy,
    completions: mpsc::UnboundedSender<Completion>,
    in_flight: Option<InFlight>,
}

impl QueryDispatcher {
    pub fn new(
        service: Arc<dyn AnswerService>,
        policy: RetryPolicy,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            service,
            policy,
            completions: tx,
            in_flight: None,
        };
        (dispatcher, rx)
    }

    /// Carry out an effect returned by the controller
    pub fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Dispatch(pending) => self.dispatch(pending),
            Effect::Abort(query) => {
                self.abort(query);
            }
        }
    }

    /// Start the answer service call for `pending`
    pub fn dispatch(&mut self, pending: PendingQuery) {
        if let Some(previous) = self.in_flight.take() {
            if !previous.handle.is_finished() {
                log::warn!("Query {} still running, aborting it", previous.query);
                previous.handle.abort();
            }
        }

        let service = Arc::clone(&self.service);
        let policy = self.policy;
        let tx = self.completions.clone();
        let PendingQuery { id, text } = pending;

        log::debug!("Dispatching query {}", id);
        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(run_query(service.as_ref(), policy, &text))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    let reason = panic_message(payload.as_ref());
                    log::error!("Answer task for query {} panicked: {}", id, reason);
                    Err(AnswerError::Crashed(reason))
                });
            if tx.send(Completion { query: id, outcome }).is_err() {
                log::debug!("Completion for query {} had no receiver", id);
            }
        });

        self.in_flight = Some(InFlight { query: id, handle });
    }

    /// Abort the task for `query`. Returns whether one was running.
    pub fn abort(&mut self, query: QueryId) -> bool {
        match self.in_flight.take() {
            Some(in_flight) if in_flight.query == query => {
                let running = !in_flight.handle.is_finished();
                in_flight.handle.abort();
                log::info!("Aborted query {}", query);
                running
            }
            other => {
                self.in_flight = other;
                false
            }
        }
    }

    /// The query whose task is still running, if any
    pub fn in_flight(&self) -> Option<QueryId> {
        self.in_flight
            .as_ref()
            .filter(|in_flight| !in_flight.handle.is_finished())
            .map(|in_flight| in_flight.query)
    }
}

impl Drop for QueryDispatcher {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.handle.abort();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Call the service with a per-attempt deadline, retrying transient failures
pub async fn run_query(
    service: &dyn AnswerService,
    policy: RetryPolicy,
    text: &str,
) -> Result<String, AnswerError> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, service.submit_query(text)).await {
            Ok(result) => result,
            Err(_) => Err(AnswerError::Timeout(policy.timeout)),
        };

        match result {
            Err(error) if error.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                log::warn!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    attempt,
                    error,
                    policy.backoff * attempt
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Plays back queued results, each after `delay`
    struct Scripted {
        delay: Duration,
        results: Mutex<VecDeque<Result<String, AnswerError>>>,
        calls: AtomicUsize,
        finished: AtomicUsize,
    }

    impl Scripted {
        fn new(delay: Duration, results: Vec<Result<String, AnswerError>>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AnswerService for Scripted {
        async fn submit_query(&self, _query: &str) -> Result<String, AnswerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("default".to_string()))
        }
    }

    fn policy(timeout_secs: u64, max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            backoff: Duration::from_millis(100),
        }
    }

    fn pending(text: &str) -> PendingQuery {
        PendingQuery {
            id: QueryId::new(),
            text: text.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_answer() {
        let service = Scripted::new(Duration::from_millis(1500), vec![Ok("answer".into())]);
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service.clone(), policy(30, 0));

        let query = pending("q");
        dispatcher.dispatch(query.clone());

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.query, query.id);
        assert_eq!(completion.outcome, Ok("answer".to_string()));
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let service = Scripted::new(Duration::from_secs(600), vec![]);
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service, policy(5, 0));

        dispatcher.dispatch(pending("slow"));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.outcome, Err(AnswerError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let service = Scripted::new(
            Duration::from_millis(10),
            vec![
                Err(AnswerError::Transport("refused".into())),
                Err(AnswerError::Status { status: 503, body: String::new() }),
                Ok("third time".into()),
            ],
        );
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service.clone(), policy(5, 2));

        dispatcher.dispatch(pending("q"));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.outcome, Ok("third time".to_string()));
        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let service = Scripted::new(
            Duration::from_millis(10),
            vec![
                Err(AnswerError::Transport("refused".into())),
                Err(AnswerError::Transport("still refused".into())),
            ],
        );
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service.clone(), policy(5, 1));

        dispatcher.dispatch(pending("q"));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.outcome, Err(AnswerError::Transport("still refused".into())));
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_failures() {
        let service = Scripted::new(
            Duration::from_millis(10),
            vec![Err(AnswerError::Status { status: 400, body: "bad question".into() })],
        );
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service.clone(), policy(5, 3));

        dispatcher.dispatch(pending("q"));

        let completion = rx.recv().await.unwrap();
        assert!(completion.outcome.is_err());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_suppresses_completion() {
        let service = Scripted::new(Duration::from_secs(10), vec![]);
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service.clone(), policy(30, 0));

        let query = pending("q");
        dispatcher.dispatch(query.clone());
        tokio::task::yield_now().await;
        assert_eq!(dispatcher.in_flight(), Some(query.id));

        assert!(dispatcher.abort(query.id));
        assert_eq!(dispatcher.in_flight(), None);

        let waited = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(waited.is_err());
        assert_eq!(service.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_ignores_other_queries() {
        let service = Scripted::new(Duration::from_secs(1), vec![Ok("kept".into())]);
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service, policy(30, 0));

        let query = pending("q");
        dispatcher.dispatch(query.clone());
        assert!(!dispatcher.abort(QueryId::new()));

        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.query, query.id);
    }

    struct Panicking;

    #[async_trait]
    impl AnswerService for Panicking {
        async fn submit_query(&self, _query: &str) -> Result<String, AnswerError> {
            panic!("backend bug");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_service_still_completes() {
        let (mut dispatcher, mut rx) = QueryDispatcher::new(Arc::new(Panicking), policy(30, 2));

        let query = pending("q");
        dispatcher.dispatch(query.clone());

        let completion = tokio::time::timeout(Duration::from_secs(3600), rx.recv())
            .await
            .expect("no completion after a panic")
            .unwrap();
        assert_eq!(completion.query, query.id);
        assert_eq!(completion.outcome, Err(AnswerError::Crashed("backend bug".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_running_task() {
        let service = Scripted::new(Duration::from_secs(10), vec![]);
        let (mut dispatcher, mut rx) = QueryDispatcher::new(service.clone(), policy(30, 0));

        dispatcher.dispatch(pending("q"));
        tokio::task::yield_now().await;
        drop(dispatcher);

        assert!(rx.recv().await.is_none());
        assert_eq!(service.finished.load(Ordering::SeqCst), 0);
    }
}
