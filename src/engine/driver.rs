//! Async event loop around [`QuizSession`].
//!
//! Timer ticks, player commands and poll results all funnel into one
//! `select!` loop, so the session is only ever touched from one place.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::{DEFAULT_PERSIST_TIMEOUT, DEFAULT_SCORE_TIMEOUT};
use crate::data::{PollPolicy, PollUpdate, QuestionSource, ScoreService, poll_questions};
use crate::error::QuizError;
use crate::models::{AnswerKey, SessionContext, Summary};
use crate::storage::ResultStore;

use super::session::{
    AnswerMode, Effect, PersistenceStatus, QuizSession, SessionSnapshot, SessionState,
};
use super::timer::Timer;

/// Player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select(AnswerKey),
    Confirm,
    RetryPersistence,
    Leave,
}

/// Everything that can reach the session loop from outside.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Command(Command),
    Poll(PollUpdate),
}

impl From<PollUpdate> for SessionEvent {
    fn from(update: PollUpdate) -> Self {
        SessionEvent::Poll(update)
    }
}

impl From<Command> for SessionEvent {
    fn from(command: Command) -> Self {
        SessionEvent::Command(command)
    }
}

enum Step {
    Event(SessionEvent),
    Tick,
    Scored(ScoreReport),
}

/// Whether the final score reached the scoring service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreReport {
    NotSent,
    Sent,
    Failed(String),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub summary: Option<Summary>,
    pub persistence: PersistenceStatus,
    /// The score is only submitted once the summary is saved. A session left
    /// while its save is still failing ends with `NotSent`.
    pub score: ScoreReport,
}

/// Cloneable front for a running session: send commands, watch snapshots.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn select(&self, key: impl Into<AnswerKey>) {
        self.send(Command::Select(key.into()));
    }

    pub fn confirm(&self) {
        self.send(Command::Confirm);
    }

    pub fn retry_persistence(&self) {
        self.send(Command::RetryPersistence);
    }

    pub fn leave(&self) {
        self.send(Command::Leave);
    }

    pub fn send(&self, command: Command) {
        let _ = self.tx.send(command.into());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }
}

pub struct SessionDriver {
    session: QuizSession,
    timer: Timer,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
    poll_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    snapshots: watch::Sender<SessionSnapshot>,
    source: Arc<dyn QuestionSource>,
    results: ResultStore,
    scores: Option<Arc<dyn ScoreService>>,
    policy: PollPolicy,
    persist_timeout: Duration,
    score_timeout: Duration,
    poller: Option<JoinHandle<()>>,
    scoring: Option<JoinHandle<ScoreReport>>,
    unavailable_after: Option<u32>,
    score: ScoreReport,
}

impl SessionDriver {
    /// Build a driver and the handle the view talks to it through.
    pub fn new(
        context: SessionContext,
        mode: AnswerMode,
        source: Arc<dyn QuestionSource>,
        results: ResultStore,
    ) -> (Self, SessionHandle) {
        let session = QuizSession::new(context, mode);
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(session.snapshot());
        let handle = SessionHandle {
            tx: tx.clone(),
            snapshots: snapshot_rx,
        };

        let driver = Self {
            session,
            timer: Timer::new(),
            rx,
            poll_tx: Some(tx),
            snapshots,
            source,
            results,
            scores: None,
            policy: PollPolicy::default(),
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
            score_timeout: DEFAULT_SCORE_TIMEOUT,
            poller: None,
            scoring: None,
            unavailable_after: None,
            score: ScoreReport::NotSent,
        };
        (driver, handle)
    }

    pub fn with_scores(mut self, scores: Arc<dyn ScoreService>) -> Self {
        self.scores = Some(scores);
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Upper bound on one score submission, which is also the longest a
    /// leave has to wait for it.
    pub fn with_score_timeout(mut self, timeout: Duration) -> Self {
        self.score_timeout = timeout;
        self
    }

    /// Run until the player leaves or every handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unavailable` if the question source gave up before
    /// any questions arrived.
    pub async fn run(self) -> Result<SessionOutcome, QuizError> {
        let span = info_span!("session", id = %self.session.context().session_id);
        self.run_loop().instrument(span).await
    }

    async fn run_loop(mut self) -> Result<SessionOutcome, QuizError> {
        self.spawn_poller();
        self.publish();

        loop {
            let step = tokio::select! {
                event = self.rx.recv() => match event {
                    Some(event) => Step::Event(event),
                    None => break,
                },
                _ = self.timer.tick() => Step::Tick,
                report = scoring_done(&mut self.scoring) => Step::Scored(report),
            };

            if !self.handle_step(step).await {
                break;
            }
            self.publish();

            if let Some(attempts) = self.unavailable_after {
                self.shutdown();
                return Err(QuizError::Unavailable { attempts });
            }
        }

        self.shutdown();
        self.finish_scoring().await;
        self.publish();
        Ok(SessionOutcome {
            summary: self.session.summary().cloned(),
            persistence: self.session.persistence().clone(),
            score: self.score.clone(),
        })
    }

    /// The poller holds the driver's own sender, so the loop ends once it is
    /// done and every handle is dropped.
    fn spawn_poller(&mut self) {
        let Some(tx) = self.poll_tx.take() else {
            return;
        };
        if self.session.state() != SessionState::Loading {
            return;
        }
        let task = poll_questions(
            Arc::clone(&self.source),
            self.session.context().clone(),
            self.policy.clone(),
            tx,
        );
        self.poller = Some(tokio::spawn(task.in_current_span()));
    }

    /// Returns false once the loop should stop.
    async fn handle_step(&mut self, step: Step) -> bool {
        let effects = match step {
            Step::Tick => self.session.tick(),
            Step::Scored(report) => {
                self.scoring = None;
                self.record_score(report);
                Vec::new()
            }
            Step::Event(SessionEvent::Command(command)) => match command {
                Command::Select(key) => {
                    if !self.session.select(key) {
                        debug!("selection ignored");
                    }
                    Vec::new()
                }
                Command::Confirm => self.session.confirm(),
                Command::RetryPersistence => self.session.retry_persistence(),
                Command::Leave => {
                    let effects = self.session.leave();
                    self.apply(effects).await;
                    info!("session left");
                    return false;
                }
            },
            Step::Event(SessionEvent::Poll(PollUpdate::Loaded(questions))) => {
                self.session.load_questions(questions)
            }
            Step::Event(SessionEvent::Poll(PollUpdate::Unavailable { attempts })) => {
                let effects = self.session.mark_unavailable();
                if self.session.state() == SessionState::Unavailable {
                    self.unavailable_after = Some(attempts);
                }
                effects
            }
        };

        self.apply(effects).await;
        true
    }

    async fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartTimer(seconds) => self.timer.restart(seconds),
                Effect::CancelTimer => self.timer.cancel(),
                Effect::StopPolling => self.stop_polling(),
                Effect::Resolved(resolution) => {
                    debug!(
                        index = resolution.index,
                        correct = resolution.correct,
                        "resolution applied"
                    );
                }
                Effect::Persist(summary) => self.persist(summary).await,
            }
        }
    }

    async fn persist(&mut self, summary: Summary) {
        // Show the pending state while the save is in flight.
        self.publish();

        let outcome = match time::timeout(self.persist_timeout, self.results.save(&summary)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!(
                "saving the result took longer than {}ms",
                self.persist_timeout.as_millis()
            )),
        };

        match &outcome {
            Ok(()) => info!(correct = summary.correct, total = summary.total, "result saved"),
            Err(reason) => warn!(%reason, "failed to save result"),
        }

        let saved = outcome.is_ok();
        self.session.persistence_settled(outcome);
        self.publish();

        // Scoring waits for a confirmed save so the service never sees a
        // score the store does not have.
        if saved {
            self.spawn_score_report(&summary);
        }
    }

    /// Submit the score in the background; the result comes back through
    /// the `select!` loop.
    fn spawn_score_report(&mut self, summary: &Summary) {
        if self.score != ScoreReport::NotSent || self.scoring.is_some() {
            return;
        }
        let Some(scores) = self.scores.clone() else {
            return;
        };

        let user_id = self.session.context().user_id.clone();
        let points = summary.score_points();
        let limit = self.score_timeout;
        let task = async move {
            match time::timeout(limit, scores.update_score(&user_id, points)).await {
                Ok(Ok(())) => ScoreReport::Sent,
                Ok(Err(err)) => ScoreReport::Failed(err.to_string()),
                Err(_) => ScoreReport::Failed(format!(
                    "score submission took longer than {}ms",
                    limit.as_millis()
                )),
            }
        };
        self.scoring = Some(tokio::spawn(task.in_current_span()));
    }

    fn record_score(&mut self, report: ScoreReport) {
        match &report {
            ScoreReport::Sent => info!("score submitted"),
            ScoreReport::Failed(reason) => warn!(%reason, "failed to submit score"),
            ScoreReport::NotSent => {}
        }
        self.score = report;
    }

    /// Let an in-flight submission finish. It is bounded by the score
    /// timeout.
    async fn finish_scoring(&mut self) {
        if let Some(mut task) = self.scoring.take() {
            let report = join_report(&mut task).await;
            self.record_score(report);
        }
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    fn shutdown(&mut self) {
        self.timer.cancel();
        self.stop_polling();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }
}

async fn join_report(task: &mut JoinHandle<ScoreReport>) -> ScoreReport {
    match task.await {
        Ok(report) => report,
        Err(err) => ScoreReport::Failed(err.to_string()),
    }
}

/// Resolves when the running score submission does; pending when there is
/// none.
async fn scoring_done(scoring: &mut Option<JoinHandle<ScoreReport>>) -> ScoreReport {
    match scoring {
        Some(task) => join_report(task).await,
        None => future::pending().await,
    }
}
