mod context;
mod question;
mod summary;

pub use context::{GroupId, SessionContext, UserId};
pub use question::{AnswerKey, AnswerOption, DEFAULT_TIMING_SECS, Question, QuestionId};
pub use summary::{AnswerRecord, POINTS_PER_CORRECT, Rating, Summary};
