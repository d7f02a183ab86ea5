pub mod machine;
pub mod service;

pub use machine::{NOT_ANSWERED, Progress, QuizRun, ReviewItem, RunState, Submission};
pub use service::{AttemptService, AttemptSession};
