#![forbid(unsafe_code)]

pub mod de;
pub mod model;
pub mod progress;
pub mod time;

pub use model::{
    AnswerError, AnswerSubmission, Card, CardId, DeckId, FlashAnswer, FlashQuestion, FlashResult,
    FlashResultItem, OptionId, Question, QuestionId, QuestionKind, QuestionOption, Session,
    SessionId, SessionMode, SessionResult, SessionStats, StartOptions, StudyItem, TestAnswer,
    TestAnswerRecord, TestResult,
};
pub use progress::ProgressInputs;
