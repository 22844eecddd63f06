use async_trait::async_trait;

use crate::error::{ScoreError, SourceError};
use crate::models::{Question, SessionContext, UserId};

/// Somewhere questions come from.
///
/// `Ok(vec![])` means the service answered but has nothing for this user yet;
/// the poller keeps asking in that case.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn fetch(&self, context: &SessionContext) -> Result<Vec<Question>, SourceError>;
}

/// Remote scoring endpoint, called once when a session is finalized.
#[async_trait]
pub trait ScoreService: Send + Sync {
    async fn update_score(&self, user_id: &UserId, score: u32) -> Result<(), ScoreError>;
}
