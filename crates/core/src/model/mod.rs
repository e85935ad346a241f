mod answer;
mod ids;
mod item;
mod result;
mod session;

pub use answer::{AnswerError, AnswerSubmission, FlashAnswer, TestAnswer};
pub use ids::{CardId, DeckId, OptionId, QuestionId, SessionId};
pub use item::{Card, FlashQuestion, Question, QuestionKind, QuestionOption, StudyItem};
pub use result::{
    FlashResult, FlashResultItem, SessionResult, SessionStats, TestAnswerRecord, TestResult,
};
pub use session::{OPTIONS_COUNT_RANGE, Session, SessionMode, StartOptions};
