mod api;
mod loader;
pub mod normalize;
mod poll;
mod source;

pub use api::{DEFAULT_API_URL, HttpQuizApi};
pub use loader::{JsonFileSource, load_questions_from_json, parse_questions};
pub use poll::{DEFAULT_POLL_INTERVAL, PollPolicy, PollUpdate, poll_questions};
pub use source::{QuestionSource, ScoreService};
