//! Quiz session state machine.
//!
//! [`QuizSession`] is synchronous and owns all session state. Every input
//! returns a list of [`Effect`]s (start or cancel the timer, stop polling,
//! persist the summary) which the driver carries out. Keeping side effects out
//! of the machine is what lets resolution and finalization be checked in plain
//! unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::{AnswerKey, AnswerRecord, Question, QuestionId, SessionContext, Summary};

use super::evaluator::evaluate;

/// How a question may be resolved besides running out of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AnswerMode {
    /// The choice is only scored when the countdown reaches zero.
    #[default]
    Timed,
    /// The player may lock in a choice before the countdown ends.
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing fetched yet.
    Loading,
    /// The source answered with no questions; keep waiting.
    Waiting,
    /// Question `index` (1-based) is on screen.
    InProgress { index: u32 },
    /// Question `index` is being scored. Never observed from outside.
    Resolving { index: u32 },
    Finished,
    /// The source gave up before any question arrived.
    Unavailable,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Unavailable)
    }
}

/// Position and score within the question list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based index of the active question; `total + 1` once finished.
    pub current: u32,
    pub correct: u32,
    pub total: u32,
}

impl Progress {
    pub fn answered(&self) -> u32 {
        self.current.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTrigger {
    Timeout,
    Confirmed,
}

/// Outcome of scoring one question, kept for feedback display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub index: u32,
    pub question_id: QuestionId,
    pub choice: Option<AnswerKey>,
    pub correct: bool,
    pub correct_key: AnswerKey,
    pub correct_text: Option<String>,
    pub trigger: ResolutionTrigger,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PersistenceStatus {
    #[default]
    NotStarted,
    Pending,
    Confirmed,
    Failed(String),
}

/// Side effect requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartTimer(u32),
    CancelTimer,
    StopPolling,
    Resolved(Resolution),
    Persist(Summary),
}

/// Read-only view of the session handed to subscribers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub mode: AnswerMode,
    pub progress: Option<Progress>,
    pub remaining: Option<u32>,
    pub questions: Arc<[Question]>,
    pub pending: Option<AnswerKey>,
    pub last_resolution: Option<Resolution>,
    pub summary: Option<Summary>,
    pub persistence: PersistenceStatus,
}

impl SessionSnapshot {
    /// The question currently on screen.
    pub fn question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress { index } | SessionState::Resolving { index } => {
                self.questions.get(index.checked_sub(1)? as usize)
            }
            _ => None,
        }
    }

    /// A finished summary only counts as available once it is stored.
    pub fn summary_available(&self) -> bool {
        self.persistence == PersistenceStatus::Confirmed
    }
}

pub struct QuizSession {
    context: SessionContext,
    mode: AnswerMode,
    state: SessionState,
    questions: Arc<[Question]>,
    progress: Option<Progress>,
    remaining: u32,
    pending: Option<AnswerKey>,
    record: AnswerRecord,
    last_resolution: Option<Resolution>,
    summary: Option<Summary>,
    finalized: bool,
    persistence: PersistenceStatus,
    closed: bool,
}

impl QuizSession {
    pub fn new(context: SessionContext, mode: AnswerMode) -> Self {
        Self {
            context,
            mode,
            state: SessionState::Loading,
            questions: Arc::from(Vec::new()),
            progress: None,
            remaining: 0,
            pending: None,
            record: AnswerRecord::default(),
            last_resolution: None,
            summary: None,
            finalized: false,
            persistence: PersistenceStatus::NotStarted,
            closed: false,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn mode(&self) -> AnswerMode {
        self.mode
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn progress(&self) -> Option<Progress> {
        self.progress
    }

    pub fn remaining(&self) -> Option<u32> {
        matches!(self.state, SessionState::InProgress { .. }).then_some(self.remaining)
    }

    pub fn pending(&self) -> Option<&AnswerKey> {
        self.pending.as_ref()
    }

    pub fn record(&self) -> &AnswerRecord {
        &self.record
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn persistence(&self) -> &PersistenceStatus {
        &self.persistence
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress { index } | SessionState::Resolving { index } => {
                self.questions.get(index.checked_sub(1)? as usize)
            }
            _ => None,
        }
    }

    /// Feed the result of one successful fetch.
    ///
    /// The question list is fixed by the first non-empty load; later loads
    /// are ignored.
    pub fn load_questions(&mut self, questions: Vec<Question>) -> Vec<Effect> {
        if self.closed || !matches!(self.state, SessionState::Loading | SessionState::Waiting) {
            return Vec::new();
        }

        let questions = drop_duplicate_ids(questions);
        if questions.is_empty() {
            if self.state == SessionState::Loading {
                debug!(session = %self.context.session_id, "no questions yet, waiting");
            }
            self.state = SessionState::Waiting;
            return Vec::new();
        }

        let total = u32::try_from(questions.len()).unwrap_or(u32::MAX);
        self.questions = Arc::from(questions);
        self.progress = Some(Progress {
            current: 1,
            correct: 0,
            total,
        });
        self.pending = None;
        self.remaining = self.questions[0].timing();
        self.state = SessionState::InProgress { index: 1 };

        info!(session = %self.context.session_id, total, "quiz started");
        vec![Effect::StopPolling, Effect::StartTimer(self.remaining)]
    }

    /// The source ran out of attempts.
    pub fn mark_unavailable(&mut self) -> Vec<Effect> {
        if self.closed || !matches!(self.state, SessionState::Loading | SessionState::Waiting) {
            return Vec::new();
        }
        self.state = SessionState::Unavailable;
        vec![Effect::StopPolling]
    }

    /// Record a pending choice for the active question. Returns whether the
    /// choice was accepted.
    pub fn select(&mut self, key: AnswerKey) -> bool {
        if self.closed || self.remaining == 0 {
            return false;
        }
        match self.state {
            SessionState::InProgress { .. } => {
                self.pending = Some(key);
                true
            }
            _ => false,
        }
    }

    /// Lock in the pending choice. Only meaningful in [`AnswerMode::Confirm`].
    pub fn confirm(&mut self) -> Vec<Effect> {
        if self.closed
            || self.mode != AnswerMode::Confirm
            || self.pending.is_none()
            || self.remaining == 0
            || !matches!(self.state, SessionState::InProgress { .. })
        {
            return Vec::new();
        }
        self.resolve(ResolutionTrigger::Confirmed)
    }

    /// One second elapsed on the active question.
    pub fn tick(&mut self) -> Vec<Effect> {
        if self.closed || !matches!(self.state, SessionState::InProgress { .. }) {
            return Vec::new();
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.resolve(ResolutionTrigger::Timeout)
        } else {
            Vec::new()
        }
    }

    fn resolve(&mut self, trigger: ResolutionTrigger) -> Vec<Effect> {
        let SessionState::InProgress { index } = self.state else {
            return Vec::new();
        };
        let Some(mut progress) = self.progress else {
            return Vec::new();
        };
        let Some(question) = self.questions.get(index as usize - 1) else {
            return Vec::new();
        };

        self.state = SessionState::Resolving { index };

        let choice = self.pending.take();
        let correct = evaluate(choice.as_ref(), &question.correct);
        let resolution = Resolution {
            index,
            question_id: question.id.clone(),
            choice: choice.clone(),
            correct,
            correct_key: question.correct.clone(),
            correct_text: question.correct_text().map(str::to_string),
            trigger,
        };

        if !self.record.append(question.id.clone(), choice, correct) {
            warn!(
                session = %self.context.session_id,
                question = %question.id,
                "question already recorded, answer dropped"
            );
        }
        if correct {
            progress.correct += 1;
        }
        progress.current += 1;
        self.progress = Some(progress);
        self.last_resolution = Some(resolution.clone());

        debug!(
            session = %self.context.session_id,
            question = %resolution.question_id,
            correct,
            ?trigger,
            "question resolved"
        );

        let mut effects = vec![Effect::CancelTimer, Effect::Resolved(resolution)];

        if progress.current <= progress.total {
            let next = &self.questions[progress.current as usize - 1];
            self.remaining = next.timing();
            self.state = SessionState::InProgress {
                index: progress.current,
            };
            effects.push(Effect::StartTimer(self.remaining));
        } else {
            self.remaining = 0;
            self.finish(&mut effects);
        }

        effects
    }

    fn finish(&mut self, effects: &mut Vec<Effect>) {
        self.state = SessionState::Finished;
        if self.finalized {
            return;
        }
        let Some(progress) = self.progress else {
            return;
        };
        self.finalized = true;

        let summary = Summary::new(progress.correct, progress.total, self.record.clone());
        info!(
            session = %self.context.session_id,
            correct = summary.correct,
            total = summary.total,
            "quiz finished"
        );
        self.summary = Some(summary.clone());
        self.persistence = PersistenceStatus::Pending;
        effects.push(Effect::Persist(summary));
    }

    /// Report how the `Persist` effect went.
    pub fn persistence_settled(&mut self, outcome: Result<(), String>) {
        if self.state != SessionState::Finished {
            return;
        }
        self.persistence = match outcome {
            Ok(()) => PersistenceStatus::Confirmed,
            Err(reason) => PersistenceStatus::Failed(reason),
        };
    }

    /// Ask for another save attempt after a failed one.
    pub fn retry_persistence(&mut self) -> Vec<Effect> {
        if !matches!(self.persistence, PersistenceStatus::Failed(_)) {
            return Vec::new();
        }
        match &self.summary {
            Some(summary) => {
                self.persistence = PersistenceStatus::Pending;
                vec![Effect::Persist(summary.clone())]
            }
            None => Vec::new(),
        }
    }

    /// The player left the screen. Nothing is processed afterwards.
    pub fn leave(&mut self) -> Vec<Effect> {
        self.closed = true;
        self.pending = None;
        vec![Effect::CancelTimer, Effect::StopPolling]
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            mode: self.mode,
            progress: self.progress,
            remaining: self.remaining(),
            questions: Arc::clone(&self.questions),
            pending: self.pending.clone(),
            last_resolution: self.last_resolution.clone(),
            summary: self.summary.clone(),
            persistence: self.persistence.clone(),
        }
    }
}

/// Answers are keyed by question id, so a repeated id would be scored but
/// never recorded.
fn drop_duplicate_ids(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::with_capacity(questions.len());
    questions
        .into_iter()
        .filter(|question| {
            let fresh = seen.insert(question.id.clone());
            if !fresh {
                warn!(question = %question.id, "dropping question with duplicate id");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerOption, UserId};

    fn question(id: &str, correct: u32, timing: u32) -> Question {
        Question {
            id: QuestionId::from(id),
            title: format!("Question {id}"),
            options: (1..=4u32)
                .map(|key| AnswerOption::new(key, format!("option {key}")))
                .collect(),
            correct: AnswerKey::from(correct),
            timing,
            group: None,
        }
    }

    fn three_questions() -> Vec<Question> {
        vec![question("q1", 4, 3), question("q2", 3, 2), question("q3", 1, 5)]
    }

    fn session(mode: AnswerMode) -> QuizSession {
        QuizSession::new(SessionContext::new(UserId::new("42")), mode)
    }

    fn run_out(session: &mut QuizSession) -> Vec<Effect> {
        let mut effects = Vec::new();
        while matches!(session.state(), SessionState::InProgress { .. }) {
            effects = session.tick();
            if !effects.is_empty() {
                break;
            }
        }
        effects
    }

    fn assert_score_in_bounds(session: &QuizSession) {
        if let Some(progress) = session.progress() {
            assert!(progress.correct <= progress.answered());
            assert!(progress.answered() <= progress.total);
        }
    }

    #[test]
    fn test_first_non_empty_load_starts_quiz() {
        let mut session = session(AnswerMode::Timed);
        assert_eq!(session.state(), SessionState::Loading);

        let effects = session.load_questions(three_questions());
        assert_eq!(effects, vec![Effect::StopPolling, Effect::StartTimer(3)]);
        assert_eq!(session.state(), SessionState::InProgress { index: 1 });
        assert_eq!(session.remaining(), Some(3));
        assert_eq!(session.current_question().map(|q| q.id.as_str()), Some("q1"));
    }

    #[test]
    fn test_empty_load_waits_without_timer() {
        let mut session = session(AnswerMode::Timed);
        assert!(session.load_questions(Vec::new()).is_empty());
        assert_eq!(session.state(), SessionState::Waiting);
        assert!(session.load_questions(Vec::new()).is_empty());
        assert_eq!(session.state(), SessionState::Waiting);

        assert!(session.tick().is_empty());
        assert!(!session.select("1".into()));
        assert!(session.confirm().is_empty());
        assert_eq!(session.remaining(), None);
        assert!(session.summary().is_none());
    }

    #[test]
    fn test_duplicate_ids_are_played_once() {
        let mut session = session(AnswerMode::Confirm);
        session.load_questions(vec![question("dup", 1, 5), question("dup", 2, 5)]);
        assert_eq!(session.progress().map(|p| p.total), Some(1));

        assert!(session.select("1".into()));
        let effects = session.confirm();
        assert!(matches!(effects.last(), Some(Effect::Persist(_))));

        let summary = session.summary().unwrap();
        assert_eq!((summary.correct, summary.total), (1, 1));
        assert_eq!(summary.correctness.len(), 1);
        assert_eq!(summary.answers.len(), 1);
    }

    #[test]
    fn test_list_is_fixed_after_start() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(three_questions());
        assert!(session.load_questions(vec![question("x", 1, 1)]).is_empty());
        assert_eq!(session.progress().map(|p| p.total), Some(3));
    }

    #[test]
    fn test_timeout_without_choice_is_incorrect() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(three_questions());

        assert!(session.tick().is_empty());
        assert!(session.tick().is_empty());
        let effects = session.tick();

        assert_eq!(effects[0], Effect::CancelTimer);
        match &effects[1] {
            Effect::Resolved(resolution) => {
                assert!(!resolution.correct);
                assert_eq!(resolution.choice, None);
                assert_eq!(resolution.trigger, ResolutionTrigger::Timeout);
                assert_eq!(resolution.correct_text.as_deref(), Some("option 4"));
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(effects[2], Effect::StartTimer(2));
        assert_eq!(session.state(), SessionState::InProgress { index: 2 });
        assert_eq!(session.record().correctness.get(&QuestionId::from("q1")), Some(&false));
        assert!(session.record().answers.is_empty());
    }

    #[test]
    fn test_later_selection_overwrites_pending_choice() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(three_questions());

        assert!(session.select("1".into()));
        assert!(session.select("alt4".into()));
        run_out(&mut session);

        assert_eq!(session.progress().map(|p| p.correct), Some(1));
        assert_eq!(session.record().answers.get(&QuestionId::from("q1")), Some(&AnswerKey::from("alt4")));
        assert_eq!(session.pending(), None);
    }

    #[test]
    fn test_confirm_is_ignored_in_timed_mode() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(three_questions());
        session.select("4".into());
        assert!(session.confirm().is_empty());
        assert_eq!(session.state(), SessionState::InProgress { index: 1 });
    }

    #[test]
    fn test_confirm_requires_a_choice() {
        let mut session = session(AnswerMode::Confirm);
        session.load_questions(three_questions());
        assert!(session.confirm().is_empty());

        session.select("4".into());
        let effects = session.confirm();
        assert!(matches!(
            &effects[1],
            Effect::Resolved(Resolution { correct: true, trigger: ResolutionTrigger::Confirmed, .. })
        ));
        assert_eq!(session.state(), SessionState::InProgress { index: 2 });
    }

    #[test]
    fn test_confirm_then_timeout_resolves_once() {
        let mut session = session(AnswerMode::Confirm);
        session.load_questions(vec![question("q1", 2, 1), question("q2", 1, 10)]);

        session.select("2".into());
        let confirmed = session.confirm();
        assert!(confirmed.iter().any(|e| matches!(e, Effect::Resolved(_))));

        // The timeout for q1 lands after confirmation; it only counts down q2.
        let late = session.tick();
        assert!(late.is_empty());
        assert!(session.confirm().is_empty());

        let progress = session.progress().unwrap();
        assert_eq!(progress.correct, 1);
        assert_eq!(progress.current, 2);
        assert_eq!(session.remaining(), Some(9));
        assert_eq!(session.record().len(), 1);
    }

    #[test]
    fn test_selection_rejected_once_time_is_up() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(vec![question("q1", 1, 1)]);
        session.tick();
        assert_eq!(session.state(), SessionState::Finished);
        assert!(!session.select("1".into()));
        assert!(session.record().answers.is_empty());
    }

    #[test]
    fn test_full_session_scores_and_persists_once() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(three_questions());

        session.select("4".into());
        run_out(&mut session);
        assert_score_in_bounds(&session);

        run_out(&mut session);
        assert_score_in_bounds(&session);

        session.select(AnswerKey::from(1u32));
        let effects = run_out(&mut session);
        assert_score_in_bounds(&session);

        let persisted: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::Persist(summary) => Some(summary.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].correct, 2);
        assert_eq!(persisted[0].total, 3);
        assert_eq!(persisted[0].correctness.get(&QuestionId::from("q2")), Some(&false));

        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.persistence(), &PersistenceStatus::Pending);
        assert!(!effects.iter().any(|e| matches!(e, Effect::StartTimer(_))));

        // Re-evaluating the finished machine never finalizes again.
        assert!(session.tick().is_empty());
        assert!(session.confirm().is_empty());
        let mut extra = Vec::new();
        session.finish(&mut extra);
        assert!(extra.is_empty());
    }

    #[test]
    fn test_persistence_failure_can_be_retried() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(vec![question("q1", 1, 1)]);
        session.tick();

        assert!(session.retry_persistence().is_empty());
        session.persistence_settled(Err("disk full".to_string()));
        assert_eq!(session.state(), SessionState::Finished);
        assert!(!session.snapshot().summary_available());

        let effects = session.retry_persistence();
        assert!(matches!(effects.as_slice(), [Effect::Persist(_)]));
        assert_eq!(session.persistence(), &PersistenceStatus::Pending);

        session.persistence_settled(Ok(()));
        assert!(session.snapshot().summary_available());
        assert!(session.retry_persistence().is_empty());
    }

    #[test]
    fn test_leave_stops_everything() {
        let mut session = session(AnswerMode::Confirm);
        session.load_questions(three_questions());
        assert_eq!(session.leave(), vec![Effect::CancelTimer, Effect::StopPolling]);
        assert_eq!(session.leave(), vec![Effect::CancelTimer, Effect::StopPolling]);

        assert!(session.is_closed());
        assert!(session.tick().is_empty());
        assert!(!session.select("4".into()));
    }

    #[test]
    fn test_unavailable_only_before_start() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(Vec::new());
        assert_eq!(session.mark_unavailable(), vec![Effect::StopPolling]);
        assert!(session.state().is_terminal());
        assert!(session.load_questions(three_questions()).is_empty());

        let mut started = self::session(AnswerMode::Timed);
        started.load_questions(three_questions());
        assert!(started.mark_unavailable().is_empty());
    }

    #[test]
    fn test_snapshot_exposes_active_question() {
        let mut session = session(AnswerMode::Timed);
        session.load_questions(three_questions());
        session.select("2".into());

        let snapshot = session.snapshot();
        assert_eq!(snapshot.question().map(|q| q.id.as_str()), Some("q1"));
        assert_eq!(snapshot.pending, Some(AnswerKey::from("2")));
        assert_eq!(snapshot.remaining, Some(3));
        assert_eq!(snapshot.persistence, PersistenceStatus::NotStarted);
    }
}
