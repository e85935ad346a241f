use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use study_core::model::{
    Card, CardId, DeckId, FlashAnswer, FlashQuestion, OptionId, Question, QuestionId, Session,
    SessionId, SessionMode, SessionResult, SessionStats, StartOptions, StudyItem, TestAnswer,
};

use crate::error::ApiError;

//
// ─── REQUESTS ──────────────────────────────────────────────────────────────────
//

/// Body of the start-session call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    mode: SessionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    share_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    only_unknown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options_count: Option<u8>,
}

impl StartSessionRequest {
    /// Build the request, dropping options that do not apply to the mode:
    /// `onlyUnknown` is CARD-only, `optionsCount` is TEST_FLASH-only.
    #[must_use]
    pub fn new(mode: SessionMode, options: &StartOptions) -> Self {
        Self {
            mode,
            share_code: options.share_code().map(str::to_owned),
            only_unknown: (mode == SessionMode::Card)
                .then(|| options.only_unknown())
                .flatten(),
            options_count: (mode == SessionMode::TestFlash)
                .then(|| options.options_count())
                .flatten(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }
}

/// Body of the test-answer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAnswerRequest {
    question_id: QuestionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_option_id: Option<OptionId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    selected_option_ids: Vec<OptionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer_text: Option<String>,
}

impl From<&TestAnswer> for TestAnswerRequest {
    fn from(answer: &TestAnswer) -> Self {
        Self {
            question_id: answer.question_id().clone(),
            selected_option_id: answer.selected_option_id().cloned(),
            selected_option_ids: answer.selected_option_ids().to_vec(),
            answer_text: answer.answer_text().map(str::to_owned),
        }
    }
}

/// Body of the flash-answer call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashAnswerRequest {
    card_id: CardId,
    selected_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_option_text: Option<String>,
}

impl From<&FlashAnswer> for FlashAnswerRequest {
    fn from(answer: &FlashAnswer) -> Self {
        Self {
            card_id: answer.card_id().clone(),
            selected_index: answer.selected_index(),
            selected_option_text: answer.selected_option_text().map(str::to_owned),
        }
    }
}

//
// ─── RESPONSES ─────────────────────────────────────────────────────────────────
//

/// A freshly started session with the first thing to present, if any.
/// CARD sessions over an empty (or fully known) deck legitimately start with
/// no first item.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedSession {
    pub session: Session,
    pub first_item: Option<StudyItem>,
}

/// Response to marking a card known/unknown.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkCardResponse {
    #[serde(default, deserialize_with = "study_core::de::option_f64")]
    pub progress: Option<f64>,
    #[serde(default)]
    pub next_card: Option<Card>,
    #[serde(default)]
    pub finished: Option<bool>,
}

/// The server's judgement of one structured answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgedAnswer {
    pub question_id: QuestionId,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub selected_option_ids: Option<Vec<OptionId>>,
}

/// Response to submitting a structured test answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAnswerResponse {
    pub answer: JudgedAnswer,
    #[serde(default)]
    pub next_question: Option<Question>,
    #[serde(default)]
    pub finished: Option<bool>,
    #[serde(default)]
    pub stats: Option<SessionStats>,
}

/// The server's judgement of one flash answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashJudgement {
    pub card_id: CardId,
    #[serde(default)]
    pub is_correct: bool,
}

/// Response to submitting a flash answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashAnswerResponse {
    pub answered: FlashJudgement,
    #[serde(default)]
    pub next_question: Option<FlashQuestion>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default)]
    pub stats: Option<SessionStats>,
}

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

/// Typed boundary over the remote session endpoints.
///
/// Submitting operations mutate server state and are serialized per session
/// by the controller; `session_result` and `list_questions` are read-only and
/// safe to retry.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Open a session on the deck and fetch the first item.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or server failures.
    async fn start_session(
        &self,
        deck_id: &DeckId,
        request: &StartSessionRequest,
    ) -> Result<StartedSession, ApiError>;

    /// Mark the current card known/unknown (CARD mode).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or server failures.
    async fn mark_card(
        &self,
        session_id: &SessionId,
        card_id: &CardId,
        known: bool,
    ) -> Result<MarkCardResponse, ApiError>;

    /// Submit an answer to the current structured question (TEST mode).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or server failures.
    async fn submit_test_answer(
        &self,
        session_id: &SessionId,
        request: &TestAnswerRequest,
    ) -> Result<TestAnswerResponse, ApiError>;

    /// Submit an answer to the current flash question (TEST_FLASH mode).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or server failures.
    async fn submit_flash_answer(
        &self,
        session_id: &SessionId,
        request: &FlashAnswerRequest,
    ) -> Result<FlashAnswerResponse, ApiError>;

    /// Fetch the session's result snapshot. Read-only.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or server failures.
    async fn session_result(&self, session_id: &SessionId) -> Result<SessionResult, ApiError>;

    /// Explicitly close the session server-side.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or server failures.
    async fn finish_session(&self, session_id: &SessionId) -> Result<Session, ApiError>;

    /// Fetch the deck's full question list. Read-only; used by resync to
    /// reconstruct the canonical question order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or server failures.
    async fn list_questions(
        &self,
        deck_id: &DeckId,
        share_code: Option<&str>,
    ) -> Result<Vec<Question>, ApiError>;
}
