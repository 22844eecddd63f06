mod driver;
mod evaluator;
mod session;
mod timer;

pub use driver::{Command, ScoreReport, SessionDriver, SessionEvent, SessionHandle, SessionOutcome};
pub use evaluator::evaluate;
pub use session::{
    AnswerMode, Effect, PersistenceStatus, Progress, QuizSession, Resolution, ResolutionTrigger,
    SessionSnapshot, SessionState,
};
pub use timer::{Countdown, TICK, Timer};
