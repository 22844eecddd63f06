use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::engine::{
    AnswerMode, PersistenceStatus, Resolution, SessionHandle, SessionSnapshot, SessionState,
};
use crate::terminal::TerminalGuard;
use crate::ui;

const INPUT_POLL: Duration = Duration::from_millis(50);

/// How long feedback for a resolved question stays on screen.
pub const FEEDBACK_HOLD: Duration = Duration::from_secs(2);

/// View state layered over the latest session snapshot.
pub struct App {
    handle: SessionHandle,
    snapshot: SessionSnapshot,
    cursor: usize,
    result_scroll: usize,
    shown_index: Option<u32>,
    feedback_since: Option<(u32, Instant)>,
    pub should_quit: bool,
}

impl App {
    pub fn new(handle: SessionHandle) -> Self {
        let snapshot = handle.snapshot();
        Self {
            handle,
            snapshot,
            cursor: 0,
            result_scroll: 0,
            shown_index: None,
            feedback_since: None,
            should_quit: false,
        }
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn result_scroll(&self) -> usize {
        self.result_scroll
    }

    /// Pull the latest snapshot. The cursor goes back to the top whenever a
    /// new question comes up.
    pub fn refresh(&mut self) {
        self.snapshot = self.handle.snapshot();
        let index = match self.snapshot.state {
            SessionState::InProgress { index } => Some(index),
            _ => None,
        };
        if index != self.shown_index {
            self.shown_index = index;
            self.cursor = 0;
        }
        self.track_feedback(Instant::now());
    }

    /// Note when a new resolution first shows up.
    fn track_feedback(&mut self, now: Instant) {
        let index = self.snapshot.last_resolution.as_ref().map(|r| r.index);
        match (index, self.feedback_since) {
            (Some(index), Some((shown, _))) if index == shown => {}
            (Some(index), _) => self.feedback_since = Some((index, now)),
            (None, _) => self.feedback_since = None,
        }
    }

    /// The latest resolution, for as long as it is still held on screen.
    pub fn feedback(&self) -> Option<&Resolution> {
        self.feedback_at(Instant::now())
    }

    fn feedback_at(&self, now: Instant) -> Option<&Resolution> {
        let (_, since) = self.feedback_since?;
        if now.saturating_duration_since(since) >= FEEDBACK_HOLD {
            return None;
        }
        self.snapshot.last_resolution.as_ref()
    }

    fn option_count(&self) -> usize {
        self.snapshot.question().map_or(0, |q| q.options.len())
    }

    pub fn move_cursor_down(&mut self) {
        let count = self.option_count();
        if count > 0 {
            self.cursor = (self.cursor + 1) % count;
        }
    }

    pub fn move_cursor_up(&mut self) {
        let count = self.option_count();
        if count > 0 {
            self.cursor = (self.cursor + count - 1) % count;
        }
    }

    /// Select the option under the cursor. In confirm mode, pressing again on
    /// the pending option locks it in.
    pub fn choose(&mut self) {
        let Some(option) = self
            .snapshot
            .question()
            .and_then(|q| q.options.get(self.cursor))
        else {
            return;
        };

        let already_pending = self.snapshot.pending.as_ref() == Some(&option.key);
        if self.snapshot.mode == AnswerMode::Confirm && already_pending {
            self.handle.confirm();
        } else {
            self.handle.select(option.key.clone());
        }
    }

    pub fn scroll_results_down(&mut self) {
        let total = self.snapshot.summary.as_ref().map_or(0, |s| s.correctness.len());
        if self.result_scroll + 1 < total {
            self.result_scroll += 1;
        }
    }

    pub fn scroll_results_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(1);
    }

    pub fn quit(&mut self) {
        self.handle.leave();
        self.should_quit = true;
    }

    pub fn handle_key(&mut self, key: KeyCode) {
        if matches!(key, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc) {
            self.quit();
            return;
        }

        match self.snapshot.state {
            SessionState::InProgress { .. } => match key {
                KeyCode::Up | KeyCode::Char('k') => self.move_cursor_up(),
                KeyCode::Down | KeyCode::Char('j') => self.move_cursor_down(),
                KeyCode::Enter | KeyCode::Char(' ') => self.choose(),
                KeyCode::Char(c) => {
                    if let Some(digit) = c.to_digit(10).filter(|d| *d > 0) {
                        let index = digit as usize - 1;
                        if index < self.option_count() {
                            self.cursor = index;
                            self.choose();
                        }
                    }
                }
                _ => {}
            },
            SessionState::Finished => match key {
                KeyCode::Down | KeyCode::Char('j') => self.scroll_results_down(),
                KeyCode::Up | KeyCode::Char('k') => self.scroll_results_up(),
                KeyCode::Char('r') | KeyCode::Char('R') => {
                    if matches!(self.snapshot.persistence, PersistenceStatus::Failed(_)) {
                        self.handle.retry_persistence();
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
}

/// Draw and read keys until the player quits.
pub async fn run_tui(app: &mut App) -> std::io::Result<()> {
    let mut guard = TerminalGuard::enter()?;

    while !app.should_quit {
        app.refresh();
        guard.terminal().draw(|frame| ui::render(frame, app))?;

        // Key polling blocks, so give the session loop a turn first.
        tokio::task::yield_now().await;
        if event::poll(INPUT_POLL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
    }

    guard.restore()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::data::QuestionSource;
    use crate::engine::{QuizSession, SessionDriver};
    use crate::error::SourceError;
    use crate::models::{AnswerKey, AnswerOption, Question, SessionContext, UserId};
    use crate::storage::{MemoryStore, ResultStore};

    struct NoQuestions;

    #[async_trait]
    impl QuestionSource for NoQuestions {
        async fn fetch(&self, _: &SessionContext) -> Result<Vec<Question>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn new_app() -> (App, SessionDriver) {
        let (driver, handle) = SessionDriver::new(
            SessionContext::new(UserId::new("1")),
            AnswerMode::Timed,
            Arc::new(NoQuestions),
            ResultStore::new(Arc::new(MemoryStore::new())),
        );
        (App::new(handle), driver)
    }

    #[test]
    fn test_starts_loading_with_cursor_at_top() {
        let (app, _driver) = new_app();
        assert_eq!(app.snapshot().state, SessionState::Loading);
        assert_eq!(app.cursor(), 0);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_cursor_does_not_move_without_a_question() {
        let (mut app, _driver) = new_app();
        app.move_cursor_down();
        app.move_cursor_up();
        assert_eq!(app.cursor(), 0);
    }

    #[test]
    fn test_quit_keys() {
        let (mut app, _driver) = new_app();
        app.handle_key(KeyCode::Esc);
        assert!(app.should_quit);

        let (mut app, _driver) = new_app();
        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_result_scroll_stays_at_zero_without_summary() {
        let (mut app, _driver) = new_app();
        app.scroll_results_down();
        app.scroll_results_up();
        assert_eq!(app.result_scroll(), 0);
    }

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            title: format!("Question {id}"),
            options: vec![AnswerOption::new("a", "First"), AnswerOption::new("b", "Second")],
            correct: AnswerKey::new("a"),
            timing: 10,
            group: None,
        }
    }

    #[test]
    fn test_feedback_is_held_for_a_short_while() {
        let (mut app, _driver) = new_app();
        let context = SessionContext::new(UserId::new("1"));
        let mut session = QuizSession::new(context, AnswerMode::Confirm);
        session.load_questions(vec![question("q1"), question("q2"), question("q3")]);

        let start = Instant::now();
        app.snapshot = session.snapshot();
        app.track_feedback(start);
        assert!(app.feedback_at(start).is_none());

        assert!(session.select(AnswerKey::new("a")));
        session.confirm();
        app.snapshot = session.snapshot();
        app.track_feedback(start);
        assert_eq!(app.feedback_at(start).map(|r| r.index), Some(1));
        assert!(app.feedback_at(start + Duration::from_secs(1)).is_some());

        // Later refreshes of the same resolution do not restart the hold.
        app.track_feedback(start + Duration::from_secs(1));
        assert!(app.feedback_at(start + FEEDBACK_HOLD).is_none());

        assert!(session.select(AnswerKey::new("b")));
        session.confirm();
        app.snapshot = session.snapshot();
        let later = start + Duration::from_secs(3);
        app.track_feedback(later);
        let feedback = app.feedback_at(later).unwrap();
        assert_eq!(feedback.index, 2);
        assert!(!feedback.correct);
    }
}
