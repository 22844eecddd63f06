//! Error types, one per boundary the engine talks to.

use std::io;

use thiserror::Error;

/// Errors from fetching or decoding the question list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    #[error("question service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("failed to read questions: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse questions: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed question payload: {0}")]
    Malformed(String),
}

/// Errors surfaced by key-value stores and the result adapter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored value is corrupt: {0}")]
    Corrupt(String),
}

/// Errors from the remote scoring service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("score update failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("score update rejected: {0}")]
    Rejected(String),
}

/// Top-level error for running a quiz.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },
    #[error("failed to load questions: {0}")]
    Source(#[from] SourceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
    #[error("session task failed: {0}")]
    Session(#[from] tokio::task::JoinError),
}
