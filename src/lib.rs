//! # quiz-session
//!
//! Timed quiz sessions: a pure state machine that sequences questions, runs
//! the per-question countdown, scores answers and persists the final summary,
//! plus a small terminal front end that drives it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use quiz_session::{Config, Quiz, QuizError, UserId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QuizError> {
//!     let mut config = Config::new(UserId::new("42"));
//!     config.questions_file = Some("questions.json".into());
//!
//!     let outcome = Quiz::new(config).run().await?;
//!     if let Some(summary) = outcome.summary {
//!         println!("{} / {}", summary.correct, summary.total);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Embedders that bring their own view use [`engine::SessionDriver`]
//! directly and watch its snapshots.

mod app;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod storage;
pub mod terminal;
mod ui;

use std::sync::Arc;

use tracing::{info, warn};

pub use app::App;
pub use config::Config;
pub use engine::{AnswerMode, SessionDriver, SessionHandle, SessionOutcome, SessionSnapshot};
pub use error::QuizError;
pub use models::{Question, Summary, UserId};

use data::{HttpQuizApi, JsonFileSource, QuestionSource, ScoreService};
use error::SourceError;
use models::SessionContext;
use storage::{FileStore, ResultStore};

/// A configured quiz, ready to run in the terminal.
pub struct Quiz {
    config: Config,
}

impl Quiz {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one session in the terminal and return how it ended.
    ///
    /// This takes over the terminal until the player quits.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built, the store cannot be read,
    /// the terminal cannot be set up, or the question source gave up.
    pub async fn run(self) -> Result<SessionOutcome, QuizError> {
        let config = self.config;
        let results = ResultStore::new(Arc::new(FileStore::new(&config.store_path)));

        let group_id = match config.group_id.clone() {
            Some(group) => {
                results.remember_group(&group).await?;
                Some(group)
            }
            None => results.selected_group().await?,
        };
        let context = SessionContext::new(config.user_id.clone()).with_group(group_id);

        let api = HttpQuizApi::new(config.api_url.clone()).map_err(SourceError::from)?;
        let source: Arc<dyn QuestionSource> = match &config.questions_file {
            Some(path) => {
                info!(path = %path.display(), "reading questions from file");
                Arc::new(JsonFileSource::new(path.clone()))
            }
            None => Arc::new(api.clone()),
        };

        let (driver, handle) = SessionDriver::new(context, config.mode, source, results);
        let mut driver = driver
            .with_poll_policy(config.poll.clone())
            .with_persist_timeout(config.persist_timeout)
            .with_score_timeout(config.score_timeout);
        if !config.offline {
            let scores: Arc<dyn ScoreService> = Arc::new(api);
            driver = driver.with_scores(scores);
        }

        let session = tokio::spawn(driver.run());

        let mut app = App::new(handle);
        let tui = app::run_tui(&mut app).await;
        if let Err(err) = &tui {
            warn!(error = %err, "terminal front end failed");
        }
        app.quit();
        drop(app);

        let outcome = session.await?;
        tui?;
        outcome
    }
}
