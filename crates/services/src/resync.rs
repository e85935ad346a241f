use std::collections::HashSet;
use std::sync::Arc;

use chrono::DateTime;

use gateway::{ApiError, SessionGateway};
use study_core::model::{DeckId, Question, SessionId, SessionResult, StudyItem};

/// What a resync attempt learned about the session.
#[derive(Debug, Clone, PartialEq)]
pub enum ResyncOutcome {
    /// The true current item, reconstructed from the server's view.
    Next(StudyItem),
    /// Every item is already answered; the session is actually over.
    Finished,
    /// The result endpoint did not describe a session this engine can
    /// recover (wrong mode); the caller falls back to the original error.
    NotPossible,
}

/// Recovers the true current item after an ambiguous submit failure.
///
/// Both operations are read-only against the server, idempotent, and safe
/// to retry; the failed answer is never re-submitted.
#[derive(Clone)]
pub struct ResyncEngine {
    gateway: Arc<dyn SessionGateway>,
}

impl ResyncEngine {
    #[must_use]
    pub fn new(gateway: Arc<dyn SessionGateway>) -> Self {
        Self { gateway }
    }

    /// Recover a TEST_FLASH session from its result snapshot: the first item
    /// the server has no selected option for is the real current step.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the result fetch fails; the caller must keep
    /// showing the original submit error in that case.
    pub async fn resync_flash(&self, session_id: &SessionId) -> Result<ResyncOutcome, ApiError> {
        let result = self.gateway.session_result(session_id).await?;
        let SessionResult::Flash(flash) = result else {
            return Ok(ResyncOutcome::NotPossible);
        };

        match flash
            .items()
            .iter()
            .find(|item| item.selected_option().is_none())
        {
            Some(pending) => Ok(ResyncOutcome::Next(StudyItem::Flash(
                pending.to_flash_question(),
            ))),
            None => Ok(ResyncOutcome::Finished),
        }
    }

    /// Recover a TEST session: diff the already-answered question ids from
    /// the result against the deck's full question list in canonical order.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if either read fails; the caller must keep showing
    /// the original submit error in that case.
    pub async fn resync_test(
        &self,
        session_id: &SessionId,
        deck_id: &DeckId,
        share_code: Option<&str>,
    ) -> Result<ResyncOutcome, ApiError> {
        let result = self.gateway.session_result(session_id).await?;
        let SessionResult::Test(test) = result else {
            return Ok(ResyncOutcome::NotPossible);
        };

        let answered: HashSet<_> = test
            .answers()
            .iter()
            .map(|answer| answer.question_id().clone())
            .collect();

        let mut questions = self.gateway.list_questions(deck_id, share_code).await?;
        sort_questions(&mut questions);

        match questions
            .into_iter()
            .find(|question| !answered.contains(question.id()))
        {
            Some(next) => Ok(ResyncOutcome::Next(StudyItem::Question(next))),
            None => Ok(ResyncOutcome::Finished),
        }
    }
}

// Canonical presentation order: creation time when every timestamp parses,
// numeric id otherwise. The choice is made once for the whole list; deciding
// per pair would not be a total order when parseable and unparseable
// timestamps mix, and `sort_by` may panic on one.
fn sort_questions(questions: &mut [Question]) {
    let all_timestamps_parse = questions.iter().all(|question| {
        question
            .created_at()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .is_some()
    });

    if all_timestamps_parse {
        questions.sort_by_key(|question| {
            question
                .created_at()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        });
    } else {
        questions.sort_by_key(|question| question.id().numeric().unwrap_or(0));
    }
}
