use thiserror::Error;

use crate::model::{CardId, FlashQuestion, OptionId, QuestionId, QuestionKind, SessionMode, StudyItem};

/// Local validation failures. These never reach the network.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("a {submitted:?} answer does not fit the current {expected:?} item")]
    ModeMismatch {
        expected: SessionMode,
        submitted: SessionMode,
    },

    #[error("single-choice answer requires exactly one selected option")]
    MissingOption,

    #[error("multi-choice answer requires at least one selected option")]
    EmptySelection,

    #[error("text answer requires a non-empty answer text")]
    EmptyText,

    #[error("selected option index {index} is out of range for {len} options")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Answer to a structured test question. Which fields must be populated
/// depends on the question kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestAnswer {
    question_id: QuestionId,
    selected_option_id: Option<OptionId>,
    selected_option_ids: Vec<OptionId>,
    answer_text: Option<String>,
}

impl TestAnswer {
    /// Single-choice answer.
    #[must_use]
    pub fn single(question_id: QuestionId, option_id: OptionId) -> Self {
        Self {
            question_id,
            selected_option_id: Some(option_id),
            selected_option_ids: Vec::new(),
            answer_text: None,
        }
    }

    /// Multi-choice answer.
    #[must_use]
    pub fn multi(question_id: QuestionId, option_ids: Vec<OptionId>) -> Self {
        Self {
            question_id,
            selected_option_id: None,
            selected_option_ids: option_ids,
            answer_text: None,
        }
    }

    /// Free-text answer.
    #[must_use]
    pub fn text(question_id: QuestionId, answer_text: impl Into<String>) -> Self {
        Self {
            question_id,
            selected_option_id: None,
            selected_option_ids: Vec::new(),
            answer_text: Some(answer_text.into()),
        }
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn selected_option_id(&self) -> Option<&OptionId> {
        self.selected_option_id.as_ref()
    }

    #[must_use]
    pub fn selected_option_ids(&self) -> &[OptionId] {
        &self.selected_option_ids
    }

    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        self.answer_text.as_deref()
    }
}

/// Answer to a generated flash question. Options have no ids, so the
/// selection is positional; the option text rides along for backends that
/// prefer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashAnswer {
    card_id: CardId,
    selected_index: usize,
    selected_option_text: Option<String>,
}

impl FlashAnswer {
    #[must_use]
    pub fn new(card_id: CardId, selected_index: usize) -> Self {
        Self {
            card_id,
            selected_index,
            selected_option_text: None,
        }
    }

    /// Build an answer for the given question, picking up the option text.
    #[must_use]
    pub fn for_question(question: &FlashQuestion, selected_index: usize) -> Self {
        Self {
            card_id: question.card_id().clone(),
            selected_index,
            selected_option_text: question.options().get(selected_index).cloned(),
        }
    }

    #[must_use]
    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    #[must_use]
    pub fn selected_option_text(&self) -> Option<&str> {
        self.selected_option_text.as_deref()
    }
}

/// One user answer, shaped per mode. Exactly one is in flight per session
/// at any time; the controller enforces that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSubmission {
    CardMark { card_id: CardId, known: bool },
    Test(TestAnswer),
    Flash(FlashAnswer),
}

impl AnswerSubmission {
    /// The session mode this submission is shaped for.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        match self {
            AnswerSubmission::CardMark { .. } => SessionMode::Card,
            AnswerSubmission::Test(_) => SessionMode::Test,
            AnswerSubmission::Flash(_) => SessionMode::TestFlash,
        }
    }

    /// Check that this submission fits the item currently presented.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::ModeMismatch` when the submission variant does
    /// not match the item variant, and kind-specific errors when a test
    /// answer's payload does not fit the question kind.
    pub fn validate_for(&self, item: &StudyItem) -> Result<(), AnswerError> {
        match (self, item) {
            (AnswerSubmission::CardMark { .. }, StudyItem::Card(_)) => Ok(()),
            (AnswerSubmission::Test(answer), StudyItem::Question(question)) => {
                match question.kind() {
                    QuestionKind::TestSingle => {
                        let selected = usize::from(answer.selected_option_id().is_some())
                            + answer.selected_option_ids().len();
                        if selected == 1 {
                            Ok(())
                        } else {
                            Err(AnswerError::MissingOption)
                        }
                    }
                    QuestionKind::TestMulti => {
                        if answer.selected_option_ids().is_empty()
                            && answer.selected_option_id().is_none()
                        {
                            Err(AnswerError::EmptySelection)
                        } else {
                            Ok(())
                        }
                    }
                    QuestionKind::Text => match answer.answer_text() {
                        Some(text) if !text.trim().is_empty() => Ok(()),
                        _ => Err(AnswerError::EmptyText),
                    },
                }
            }
            (AnswerSubmission::Flash(answer), StudyItem::Flash(question)) => {
                let len = question.options().len();
                if answer.selected_index() < len {
                    Ok(())
                } else {
                    Err(AnswerError::IndexOutOfRange {
                        index: answer.selected_index(),
                        len,
                    })
                }
            }
            (submission, item) => Err(AnswerError::ModeMismatch {
                expected: item.mode(),
                submitted: submission.mode(),
            }),
        }
    }
}
