//! Polling the question source until it has something to offer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};

use crate::models::{Question, SessionContext};

use super::source::QuestionSource;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// How often and how long to keep asking for questions.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until questions arrive or the session is left.
    pub max_attempts: Option<u32>,
    /// Growth factor applied to the delay after each attempt; 1.0 keeps it
    /// constant.
    pub backoff: f64,
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
            backoff: 1.0,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Delay to wait after the given (1-based) attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff.max(1.0).powi(attempt.saturating_sub(1) as i32);
        let delay = self.interval.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_interval.as_secs_f64() {
            self.max_interval.max(self.interval)
        } else {
            Duration::from_secs_f64(delay)
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// What the poller reports back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    Loaded(Vec<Question>),
    Unavailable { attempts: u32 },
}

/// Poll `source` until it returns a non-empty list, then stop for good.
///
/// Every successful fetch is forwarded, but an empty result only the first
/// time so the session can show its waiting screen. Fetch errors are logged
/// and treated as "nothing yet". Returns early once the receiver is gone.
pub async fn poll_questions<E>(
    source: Arc<dyn QuestionSource>,
    context: SessionContext,
    policy: PollPolicy,
    tx: mpsc::UnboundedSender<E>,
) where
    E: From<PollUpdate>,
{
    let mut attempts = 0u32;
    let mut reported_empty = false;

    loop {
        attempts += 1;
        match source.fetch(&context).await {
            Ok(questions) if !questions.is_empty() => {
                info!(session = %context.session_id, attempts, count = questions.len(), "questions available");
                let _ = tx.send(PollUpdate::Loaded(questions).into());
                return;
            }
            Ok(_) => {
                debug!(session = %context.session_id, attempts, "question source is empty");
                if !reported_empty {
                    reported_empty = true;
                    if tx.send(PollUpdate::Loaded(Vec::new()).into()).is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                warn!(session = %context.session_id, attempts, error = %err, "failed to fetch questions");
            }
        }

        if policy.exhausted(attempts) {
            warn!(session = %context.session_id, attempts, "giving up on question source");
            let _ = tx.send(PollUpdate::Unavailable { attempts }.into());
            return;
        }
        if tx.is_closed() {
            return;
        }

        time::sleep(policy.delay_after(attempts)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::error::SourceError;
    use crate::models::{AnswerKey, AnswerOption, QuestionId, UserId};

    /// Replays scripted responses, then keeps returning an empty list.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Vec<Question>, SourceError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<Question>, SourceError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl QuestionSource for ScriptedSource {
        async fn fetch(&self, _context: &SessionContext) -> Result<Vec<Question>, SourceError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn question() -> Question {
        Question {
            id: QuestionId::from("q1"),
            title: "t".to_string(),
            options: vec![AnswerOption::new(1u32, "a"), AnswerOption::new(2u32, "b")],
            correct: AnswerKey::from(1u32),
            timing: 10,
            group: None,
        }
    }

    fn context() -> SessionContext {
        SessionContext::new(UserId::new("7"))
    }

    #[test]
    fn test_delay_grows_with_backoff_and_caps() {
        let policy = PollPolicy {
            interval: Duration::from_secs(1),
            max_attempts: None,
            backoff: 2.0,
            max_interval: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(5));
        assert_eq!(PollPolicy::default().delay_after(9), DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_through_failures_until_questions_arrive() {
        let source = ScriptedSource::new(vec![
            Err(SourceError::Malformed("boom".to_string())),
            Ok(Vec::new()),
            Ok(Vec::new()),
            Ok(vec![question()]),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel::<PollUpdate>();

        let started = Instant::now();
        poll_questions(source.clone(), context(), PollPolicy::default(), tx).await;

        assert_eq!(source.calls(), 4);
        assert!(started.elapsed() >= DEFAULT_POLL_INTERVAL * 3);
        assert_eq!(rx.recv().await, Some(PollUpdate::Loaded(Vec::new())));
        assert_eq!(rx.recv().await, Some(PollUpdate::Loaded(vec![question()])));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempt_budget() {
        let source = ScriptedSource::new(vec![
            Err(SourceError::Malformed("down".to_string())),
            Err(SourceError::Malformed("down".to_string())),
            Err(SourceError::Malformed("down".to_string())),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel::<PollUpdate>();
        let policy = PollPolicy {
            max_attempts: Some(3),
            ..PollPolicy::default()
        };

        poll_questions(source.clone(), context(), policy, tx).await;

        assert_eq!(source.calls(), 3);
        assert_eq!(rx.recv().await, Some(PollUpdate::Unavailable { attempts: 3 }));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_receiver_dropped() {
        let source = ScriptedSource::new(Vec::new());
        let (tx, rx) = mpsc::unbounded_channel::<PollUpdate>();
        drop(rx);

        poll_questions(source.clone(), context(), PollPolicy::default(), tx).await;
        assert_eq!(source.calls(), 1);
    }
}
