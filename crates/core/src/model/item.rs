use serde::{Deserialize, Serialize};

use crate::model::{CardId, DeckId, OptionId, QuestionId, SessionMode};

/// A two-sided flash card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    id: CardId,
    #[serde(default)]
    deck_id: Option<DeckId>,
    question: String,
    answer: String,
    #[serde(default)]
    known: Option<bool>,
}

impl Card {
    #[must_use]
    pub fn new(id: CardId, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id,
            deck_id: None,
            question: question.into(),
            answer: answer.into(),
            known: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &CardId {
        &self.id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn known(&self) -> Option<bool> {
        self.known
    }
}

/// Kind of a structured test question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    TestSingle,
    TestMulti,
    Text,
}

/// One selectable option of a structured question. `is_correct` is only
/// populated by the server after the question has been answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    #[serde(default)]
    id: Option<OptionId>,
    text: String,
    #[serde(default)]
    is_correct: Option<bool>,
}

impl QuestionOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            text: text.into(),
            is_correct: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&OptionId> {
        self.id.as_ref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }
}

/// An authored test question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    #[serde(default)]
    deck_id: Option<DeckId>,
    #[serde(default)]
    title: String,
    prompt: String,
    #[serde(rename = "type")]
    kind: QuestionKind,
    #[serde(default)]
    answer_text: Option<String>,
    #[serde(default)]
    options: Vec<QuestionOption>,
    // Kept raw: ordering falls back to numeric ids when this is unparseable.
    #[serde(default)]
    created_at: Option<String>,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, prompt: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id,
            deck_id: None,
            title: String::new(),
            prompt: prompt.into(),
            kind,
            answer_text: None,
            options: Vec::new(),
            created_at: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<QuestionOption>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = Some(created_at.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        self.answer_text.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[QuestionOption] {
        &self.options
    }

    #[must_use]
    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// An ephemeral multiple-choice question generated from a card for
/// TEST_FLASH sessions. Options carry no ids; position is their identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashQuestion {
    card_id: CardId,
    prompt: String,
    options: Vec<String>,
}

impl FlashQuestion {
    #[must_use]
    pub fn new(card_id: CardId, prompt: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            card_id,
            prompt: prompt.into(),
            options,
        }
    }

    #[must_use]
    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// The item a session is currently presenting. The variant in play is fixed
/// by the session mode for the whole session.
#[derive(Debug, Clone, PartialEq)]
pub enum StudyItem {
    Card(Card),
    Question(Question),
    Flash(FlashQuestion),
}

impl StudyItem {
    /// The session mode this item belongs to.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        match self {
            StudyItem::Card(_) => SessionMode::Card,
            StudyItem::Question(_) => SessionMode::Test,
            StudyItem::Flash(_) => SessionMode::TestFlash,
        }
    }

    #[must_use]
    pub fn matches_mode(&self, mode: SessionMode) -> bool {
        self.mode() == mode
    }
}
