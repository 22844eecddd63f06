//! Runtime configuration, filled from the command line or `QUIZ_*` variables.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::data::{DEFAULT_API_URL, PollPolicy};
use crate::engine::AnswerMode;
use crate::models::{GroupId, UserId};

pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SCORE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_STORE_PATH: &str = "quiz-store.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub user_id: UserId,
    /// Falls back to the group remembered in the store when unset.
    pub group_id: Option<GroupId>,
    pub mode: AnswerMode,
    pub poll: PollPolicy,
    pub persist_timeout: Duration,
    pub score_timeout: Duration,
    pub store_path: PathBuf,
    /// Read questions from this file instead of the question service.
    pub questions_file: Option<PathBuf>,
    /// Skip reporting the final score to the scoring service.
    pub offline: bool,
}

impl Config {
    pub fn new(user_id: UserId) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_id,
            group_id: None,
            mode: AnswerMode::default(),
            poll: PollPolicy::default(),
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
            score_timeout: DEFAULT_SCORE_TIMEOUT,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            questions_file: None,
            offline: false,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Timed quiz sessions in the terminal", long_about = None)]
pub struct Args {
    /// Id of the student taking the quiz
    #[arg(short, long, env = "QUIZ_USER_ID")]
    pub user: String,

    /// Base URL of the quiz service
    #[arg(long, env = "QUIZ_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Class group; defaults to the one remembered in the store
    #[arg(short, long, env = "QUIZ_GROUP_ID")]
    pub group: Option<String>,

    /// When a question is scored
    #[arg(short, long, env = "QUIZ_MODE", value_enum, default_value_t = AnswerMode::Timed)]
    pub mode: AnswerMode,

    /// JSON file to load the questions from instead of the service
    #[arg(short, long, env = "QUIZ_QUESTIONS_FILE")]
    pub questions: Option<PathBuf>,

    /// Key-value store used for results
    #[arg(long, env = "QUIZ_STORE", default_value = DEFAULT_STORE_PATH)]
    pub store: PathBuf,

    /// Milliseconds between question polls
    #[arg(long, env = "QUIZ_POLL_INTERVAL_MS", default_value_t = 1500)]
    pub poll_interval_ms: u64,

    /// Give up after this many polls (unlimited when omitted)
    #[arg(long, env = "QUIZ_MAX_POLL_ATTEMPTS")]
    pub max_poll_attempts: Option<u32>,

    /// Multiplier applied to the poll delay after each attempt
    #[arg(long, env = "QUIZ_POLL_BACKOFF", default_value_t = 1.0)]
    pub poll_backoff: f64,

    /// Milliseconds to wait for the result to be saved
    #[arg(long, env = "QUIZ_PERSIST_TIMEOUT_MS", default_value_t = 5000)]
    pub persist_timeout_ms: u64,

    /// Milliseconds to wait for the scoring service
    #[arg(long, env = "QUIZ_SCORE_TIMEOUT_MS", default_value_t = 10000)]
    pub score_timeout_ms: u64,

    /// Do not send the final score to the service
    #[arg(long, env = "QUIZ_OFFLINE")]
    pub offline: bool,

    /// Write logs to this file (filtered by RUST_LOG)
    #[arg(long, env = "QUIZ_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn into_config(self) -> Config {
        let interval = Duration::from_millis(self.poll_interval_ms.max(1));
        Config {
            api_url: self.api_url,
            user_id: UserId::new(self.user),
            group_id: self.group.map(GroupId::new),
            mode: self.mode,
            poll: PollPolicy {
                interval,
                max_attempts: self.max_poll_attempts,
                backoff: self.poll_backoff,
                max_interval: PollPolicy::default().max_interval.max(interval),
            },
            persist_timeout: Duration::from_millis(self.persist_timeout_ms),
            score_timeout: Duration::from_millis(self.score_timeout_ms),
            store_path: self.store,
            questions_file: self.questions,
            offline: self.offline,
        }
    }
}
