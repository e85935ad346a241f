//! End-to-end controller flows against a scripted gateway.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use gateway::{
    ApiError, FlashAnswerRequest, FlashAnswerResponse, JudgedAnswer, MarkCardResponse,
    SessionGateway, StartSessionRequest, StartedSession, TestAnswerRequest, TestAnswerResponse,
};
use services::{
    ControllerError, ControllerState, SessionController, StartOutcome, SubmitOutcome,
};
use study_core::model::{
    AnswerSubmission, Card, CardId, DeckId, FlashAnswer, FlashQuestion, OptionId, Question,
    QuestionId, QuestionKind, QuestionOption, Session, SessionId, SessionMode, SessionResult,
    StartOptions, StudyItem, TestAnswer,
};
use study_core::time::fixed_now;

//
// ─── SCRIPTED GATEWAY ──────────────────────────────────────────────────────────
//

#[derive(Default)]
struct CallCounts {
    start: AtomicUsize,
    mark: AtomicUsize,
    test_answer: AtomicUsize,
    flash_answer: AtomicUsize,
    result: AtomicUsize,
    finish: AtomicUsize,
    questions: AtomicUsize,
}

/// Gateway stub that replays queued responses per operation and panics on
/// anything the test did not script.
#[derive(Default)]
struct ScriptedGateway {
    starts: Mutex<VecDeque<Result<StartedSession, ApiError>>>,
    marks: Mutex<VecDeque<Result<MarkCardResponse, ApiError>>>,
    test_answers: Mutex<VecDeque<Result<TestAnswerResponse, ApiError>>>,
    flash_answers: Mutex<VecDeque<Result<FlashAnswerResponse, ApiError>>>,
    results: Mutex<VecDeque<Result<SessionResult, ApiError>>>,
    finishes: Mutex<VecDeque<Result<Session, ApiError>>>,
    question_lists: Mutex<VecDeque<Result<Vec<Question>, ApiError>>>,
    calls: CallCounts,
    // When set, submit calls block until notified; used to observe the
    // controller while a call is in flight.
    submit_gate: Option<Arc<Notify>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self::default()
    }

    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            submit_gate: Some(gate),
            ..Self::default()
        }
    }

    fn queue_start(&self, response: Result<StartedSession, ApiError>) {
        self.starts.lock().unwrap().push_back(response);
    }

    fn queue_mark(&self, response: Result<MarkCardResponse, ApiError>) {
        self.marks.lock().unwrap().push_back(response);
    }

    fn queue_test_answer(&self, response: Result<TestAnswerResponse, ApiError>) {
        self.test_answers.lock().unwrap().push_back(response);
    }

    fn queue_flash_answer(&self, response: Result<FlashAnswerResponse, ApiError>) {
        self.flash_answers.lock().unwrap().push_back(response);
    }

    fn queue_result(&self, response: Result<SessionResult, ApiError>) {
        self.results.lock().unwrap().push_back(response);
    }

    fn queue_finish(&self, response: Result<Session, ApiError>) {
        self.finishes.lock().unwrap().push_back(response);
    }

    fn queue_questions(&self, response: Result<Vec<Question>, ApiError>) {
        self.question_lists.lock().unwrap().push_back(response);
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>, operation: &str) -> Result<T, ApiError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted {operation} call"))
    }

    async fn enter_submit(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(gate) = &self.submit_gate {
            gate.notified().await;
        }
    }

    fn leave_submit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionGateway for ScriptedGateway {
    async fn start_session(
        &self,
        _deck_id: &DeckId,
        _request: &StartSessionRequest,
    ) -> Result<StartedSession, ApiError> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.starts, "start_session")
    }

    async fn mark_card(
        &self,
        _session_id: &SessionId,
        _card_id: &CardId,
        _known: bool,
    ) -> Result<MarkCardResponse, ApiError> {
        self.calls.mark.fetch_add(1, Ordering::SeqCst);
        self.enter_submit().await;
        let response = Self::pop(&self.marks, "mark_card");
        self.leave_submit();
        response
    }

    async fn submit_test_answer(
        &self,
        _session_id: &SessionId,
        _request: &TestAnswerRequest,
    ) -> Result<TestAnswerResponse, ApiError> {
        self.calls.test_answer.fetch_add(1, Ordering::SeqCst);
        self.enter_submit().await;
        let response = Self::pop(&self.test_answers, "submit_test_answer");
        self.leave_submit();
        response
    }

    async fn submit_flash_answer(
        &self,
        _session_id: &SessionId,
        _request: &FlashAnswerRequest,
    ) -> Result<FlashAnswerResponse, ApiError> {
        self.calls.flash_answer.fetch_add(1, Ordering::SeqCst);
        self.enter_submit().await;
        let response = Self::pop(&self.flash_answers, "submit_flash_answer");
        self.leave_submit();
        response
    }

    async fn session_result(&self, _session_id: &SessionId) -> Result<SessionResult, ApiError> {
        self.calls.result.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.results, "session_result")
    }

    async fn finish_session(&self, _session_id: &SessionId) -> Result<Session, ApiError> {
        self.calls.finish.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.finishes, "finish_session")
    }

    async fn list_questions(
        &self,
        _deck_id: &DeckId,
        _share_code: Option<&str>,
    ) -> Result<Vec<Question>, ApiError> {
        self.calls.questions.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.question_lists, "list_questions")
    }
}

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

fn session(mode: SessionMode) -> Session {
    Session::new(
        SessionId::new("S1"),
        DeckId::new("D1"),
        mode,
        fixed_now(),
    )
}

fn question(id: &str) -> Question {
    Question::new(QuestionId::new(id), format!("prompt {id}"), QuestionKind::TestSingle)
        .with_options(vec![
            QuestionOption::new(OptionId::new("O1"), "a"),
            QuestionOption::new(OptionId::new("O2"), "b"),
        ])
        .with_created_at(format!("2024-01-0{id}T00:00:00Z"))
}

fn flash_question(card_id: &str) -> FlashQuestion {
    FlashQuestion::new(
        CardId::new(card_id),
        format!("prompt {card_id}"),
        vec!["a".into(), "b".into(), "c".into()],
    )
}

fn card(id: &str) -> Card {
    Card::new(CardId::new(id), format!("front {id}"), format!("back {id}"))
}

fn single_answer(question_id: &str) -> AnswerSubmission {
    AnswerSubmission::Test(TestAnswer::single(
        QuestionId::new(question_id),
        OptionId::new("O1"),
    ))
}

fn judged(question_id: &str) -> JudgedAnswer {
    JudgedAnswer {
        question_id: QuestionId::new(question_id),
        is_correct: Some(true),
        selected_option_ids: None,
    }
}

fn stats(progress: f64, correct: f64, total: f64) -> study_core::model::SessionStats {
    serde_json::from_value(serde_json::json!({
        "progressPercent": progress,
        "correctCount": correct,
        "totalAnswered": total,
    }))
    .unwrap()
}

fn desync_error() -> ApiError {
    ApiError::new("Internal Server Error").with_status(500)
}

async fn started_test_controller(
    gateway: Arc<ScriptedGateway>,
    first: Question,
) -> SessionController {
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Test),
        first_item: Some(StudyItem::Question(first)),
    }));
    let controller = SessionController::new(gateway);
    controller
        .start(DeckId::new("D1"), SessionMode::Test, StartOptions::new())
        .await
        .unwrap();
    controller
}

//
// ─── FLOWS ─────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn test_session_advances_through_questions() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_test_answer(Ok(TestAnswerResponse {
        answer: judged("1"),
        next_question: Some(question("2")),
        finished: Some(false),
        stats: Some(stats(0.5, 1.0, 2.0)),
    }));

    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;
    assert_eq!(controller.state(), ControllerState::Presenting);

    let outcome = controller.submit_answer(single_answer("1")).await.unwrap();
    let SubmitOutcome::Next(StudyItem::Question(next)) = outcome else {
        panic!("expected the next question");
    };
    assert_eq!(next.id().as_str(), "2");
    assert_eq!(controller.state(), ControllerState::Presenting);
    assert_eq!(controller.progress_percent(), 50);
}

#[tokio::test]
async fn test_session_finishes_on_the_last_answer() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_test_answer(Ok(TestAnswerResponse {
        answer: judged("1"),
        next_question: None,
        finished: Some(true),
        stats: Some(stats(100.0, 2.0, 2.0)),
    }));

    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;
    let outcome = controller.submit_answer(single_answer("1")).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Finished);
    assert_eq!(controller.state(), ControllerState::Finished);
    assert!(controller.current_item().is_none());
    assert_eq!(controller.progress_percent(), 100);
    // No explicit finish call outside CARD mode.
    assert_eq!(gateway.calls.finish.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ambiguous_submit_response_closes_the_session() {
    let gateway = Arc::new(ScriptedGateway::new());
    // Neither a next question nor a finished flag.
    gateway.queue_test_answer(Ok(TestAnswerResponse {
        answer: judged("1"),
        next_question: None,
        finished: None,
        stats: None,
    }));

    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;
    let outcome = controller.submit_answer(single_answer("1")).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Finished);
    assert_eq!(controller.state(), ControllerState::Finished);
}

#[tokio::test]
async fn validation_failure_blocks_the_submission_locally() {
    let gateway = Arc::new(ScriptedGateway::new());
    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;

    let wrong_shape =
        AnswerSubmission::Flash(FlashAnswer::new(CardId::new("42"), 0));
    let err = controller.submit_answer(wrong_shape).await.unwrap_err();

    assert!(matches!(err, ControllerError::Answer(_)));
    assert_eq!(controller.state(), ControllerState::Presenting);
    assert_eq!(gateway.calls.test_answer.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.calls.flash_answer.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unclassified_submit_failure_keeps_the_session_retryable() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_test_answer(Err(ApiError::new("deck not found").with_status(404)));
    gateway.queue_test_answer(Ok(TestAnswerResponse {
        answer: judged("1"),
        next_question: Some(question("2")),
        finished: Some(false),
        stats: None,
    }));

    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;

    let err = controller.submit_answer(single_answer("1")).await.unwrap_err();
    assert!(matches!(err, ControllerError::Api(_)));
    assert_eq!(controller.state(), ControllerState::Presenting);
    // The current item is untouched and the same answer can be retried.
    assert!(matches!(
        controller.current_item(),
        Some(StudyItem::Question(q)) if q.id().as_str() == "1"
    ));
    // No resync for non-desync failures.
    assert_eq!(gateway.calls.result.load(Ordering::SeqCst), 0);

    let outcome = controller.submit_answer(single_answer("1")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Next(_)));
}

//
// ─── RESYNC ────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn flash_desync_recovers_the_current_item_without_resubmitting() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::TestFlash),
        first_item: Some(StudyItem::Flash(flash_question("41"))),
    }));
    gateway.queue_flash_answer(Err(desync_error()));
    gateway.queue_result(Ok(serde_json::from_value(serde_json::json!({
        "mode": "TEST_FLASH",
        "stats": {"totalAnswered": 1, "correctCount": 1, "progressPercent": 50},
        "items": [
            {"cardId": 41, "prompt": "prompt 41", "options": ["a", "b", "c"], "selectedOption": "a", "isCorrect": true},
            {"cardId": 42, "prompt": "prompt 42", "options": ["d", "e", "f"], "selectedOption": null, "isCorrect": false},
        ],
    }))
    .unwrap()));

    let controller = SessionController::new(Arc::clone(&gateway) as Arc<dyn SessionGateway>);
    controller
        .start(DeckId::new("D1"), SessionMode::TestFlash, StartOptions::new())
        .await
        .unwrap();

    let answer = AnswerSubmission::Flash(FlashAnswer::for_question(&flash_question("41"), 0));
    let outcome = controller.submit_answer(answer).await.unwrap();

    let SubmitOutcome::Resynced(StudyItem::Flash(recovered)) = outcome else {
        panic!("expected a resynced flash question");
    };
    assert_eq!(recovered.card_id().as_str(), "42");
    assert_eq!(recovered.options(), ["d", "e", "f"]);
    assert_eq!(controller.state(), ControllerState::Presenting);
    // The failed answer was never re-submitted.
    assert_eq!(gateway.calls.flash_answer.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_desync_resync_diffs_against_the_question_list() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_test_answer(Err(
        ApiError::new("rejected").with_code("NOT_CURRENT_STEP"),
    ));
    gateway.queue_result(Ok(serde_json::from_value(serde_json::json!({
        "mode": "TEST",
        "session": {"testAnswers": [{"questionId": "1", "isCorrect": true}]},
    }))
    .unwrap()));
    gateway.queue_questions(Ok(vec![question("2"), question("1"), question("3")]));

    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;
    let outcome = controller.submit_answer(single_answer("1")).await.unwrap();

    let SubmitOutcome::Resynced(StudyItem::Question(next)) = outcome else {
        panic!("expected a resynced structured question");
    };
    assert_eq!(next.id().as_str(), "2");
    assert_eq!(controller.state(), ControllerState::Presenting);
    assert_eq!(gateway.calls.test_answer.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resync_finding_everything_answered_finishes_the_session() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_test_answer(Err(
        ApiError::new("rejected").with_code("QUESTION_ALREADY_ANSWERED"),
    ));
    gateway.queue_result(Ok(serde_json::from_value(serde_json::json!({
        "mode": "TEST",
        "session": {"testAnswers": [
            {"questionId": "1", "isCorrect": true},
            {"questionId": "2", "isCorrect": false},
        ]},
    }))
    .unwrap()));
    gateway.queue_questions(Ok(vec![question("1"), question("2")]));

    let controller = started_test_controller(Arc::clone(&gateway), question("2")).await;
    let outcome = controller.submit_answer(single_answer("2")).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Finished);
    assert_eq!(controller.state(), ControllerState::Finished);
}

#[tokio::test]
async fn failed_resync_surfaces_the_original_error() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_test_answer(Err(desync_error()));
    gateway.queue_result(Err(ApiError::new("result unavailable").with_status(503)));

    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;
    let err = controller.submit_answer(single_answer("1")).await.unwrap_err();

    let ControllerError::Api(original) = err else {
        panic!("expected the original submit error");
    };
    assert_eq!(original.message(), "Internal Server Error");
    assert_eq!(controller.state(), ControllerState::Presenting);
}

//
// ─── CARD MODE ─────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn card_session_over_an_empty_deck_starts_finished() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Card),
        first_item: None,
    }));

    let controller = SessionController::new(Arc::clone(&gateway) as Arc<dyn SessionGateway>);
    let outcome = controller
        .start(DeckId::new("D1"), SessionMode::Card, StartOptions::new())
        .await
        .unwrap();

    assert_eq!(outcome, StartOutcome::AlreadyFinished);
    assert_eq!(controller.state(), ControllerState::Finished);
    assert_eq!(controller.progress_percent(), 0);
}

#[tokio::test]
async fn card_finish_failure_stays_recoverable_without_remarking() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Card),
        first_item: Some(StudyItem::Card(card("C1"))),
    }));
    gateway.queue_mark(Ok(MarkCardResponse {
        progress: Some(1.0),
        next_card: None,
        finished: Some(true),
    }));
    gateway.queue_finish(Err(ApiError::new("timeout")));
    gateway.queue_finish(Ok(session(SessionMode::Card)));

    let controller = SessionController::new(Arc::clone(&gateway) as Arc<dyn SessionGateway>);
    controller
        .start(DeckId::new("D1"), SessionMode::Card, StartOptions::new())
        .await
        .unwrap();

    let mark = AnswerSubmission::CardMark {
        card_id: CardId::new("C1"),
        known: true,
    };
    let err = controller.submit_answer(mark.clone()).await.unwrap_err();
    assert!(matches!(err, ControllerError::Finish(_)));
    assert_eq!(controller.state(), ControllerState::Submitting);
    assert!(controller.finish_pending());

    // Re-submitting would double-count the mark; only retry_finish moves on.
    let err = controller.submit_answer(mark).await.unwrap_err();
    assert!(matches!(err, ControllerError::Busy));
    assert_eq!(gateway.calls.mark.load(Ordering::SeqCst), 1);

    controller.retry_finish().await.unwrap();
    assert_eq!(controller.state(), ControllerState::Finished);
    assert!(!controller.finish_pending());
    assert_eq!(gateway.calls.finish.load(Ordering::SeqCst), 2);
    assert_eq!(controller.progress_percent(), 100);
}

#[tokio::test]
async fn card_completion_runs_the_explicit_finish_call() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Card),
        first_item: Some(StudyItem::Card(card("C1"))),
    }));
    gateway.queue_mark(Ok(MarkCardResponse {
        progress: Some(1.0),
        next_card: None,
        finished: Some(true),
    }));
    gateway.queue_finish(Ok(session(SessionMode::Card)));

    let controller = SessionController::new(Arc::clone(&gateway) as Arc<dyn SessionGateway>);
    controller
        .start(DeckId::new("D1"), SessionMode::Card, StartOptions::new())
        .await
        .unwrap();

    let outcome = controller
        .submit_answer(AnswerSubmission::CardMark {
            card_id: CardId::new("C1"),
            known: false,
        })
        .await
        .unwrap();

    assert_eq!(outcome, SubmitOutcome::Finished);
    assert_eq!(controller.state(), ControllerState::Finished);
    assert_eq!(gateway.calls.finish.load(Ordering::SeqCst), 1);
}

//
// ─── START AND LIFECYCLE ───────────────────────────────────────────────────────
//

#[tokio::test]
async fn test_start_without_a_first_question_fails() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Test),
        first_item: None,
    }));

    let controller = SessionController::new(Arc::clone(&gateway) as Arc<dyn SessionGateway>);
    let err = controller
        .start(DeckId::new("D1"), SessionMode::Test, StartOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ControllerError::MissingFirstItem(SessionMode::Test)
    ));
    assert_eq!(controller.state(), ControllerState::Failed);
}

#[tokio::test]
async fn start_failure_lands_in_failed() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_start(Err(ApiError::new("deck not found").with_status(404)));

    let controller = SessionController::new(Arc::clone(&gateway) as Arc<dyn SessionGateway>);
    let err = controller
        .start(DeckId::new("D1"), SessionMode::Test, StartOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ControllerError::Api(_)));
    assert_eq!(controller.state(), ControllerState::Failed);

    // A failed controller rejects further work until cancelled back to Idle.
    let err = controller.submit_answer(single_answer("1")).await.unwrap_err();
    assert!(matches!(err, ControllerError::InvalidState(_)));
}

#[tokio::test]
async fn concurrent_submissions_are_rejected_not_queued() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(ScriptedGateway::gated(Arc::clone(&gate)));
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Test),
        first_item: Some(StudyItem::Question(question("1"))),
    }));
    gateway.queue_test_answer(Ok(TestAnswerResponse {
        answer: judged("1"),
        next_question: Some(question("2")),
        finished: Some(false),
        stats: None,
    }));

    let controller = Arc::new(SessionController::new(
        Arc::clone(&gateway) as Arc<dyn SessionGateway>
    ));
    controller
        .start(DeckId::new("D1"), SessionMode::Test, StartOptions::new())
        .await
        .unwrap();

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_answer(single_answer("1")).await })
    };
    tokio::task::yield_now().await;
    assert_eq!(controller.state(), ControllerState::Submitting);

    let err = controller.submit_answer(single_answer("1")).await.unwrap_err();
    assert!(matches!(err, ControllerError::Busy));

    gate.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmitOutcome::Next(_)));
    assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_discards_an_in_flight_response() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(ScriptedGateway::gated(Arc::clone(&gate)));
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Test),
        first_item: Some(StudyItem::Question(question("1"))),
    }));
    gateway.queue_test_answer(Ok(TestAnswerResponse {
        answer: judged("1"),
        next_question: Some(question("2")),
        finished: Some(false),
        stats: None,
    }));

    let controller = Arc::new(SessionController::new(
        Arc::clone(&gateway) as Arc<dyn SessionGateway>
    ));
    controller
        .start(DeckId::new("D1"), SessionMode::Test, StartOptions::new())
        .await
        .unwrap();

    let in_flight = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.submit_answer(single_answer("1")).await })
    };
    tokio::task::yield_now().await;

    controller.cancel();
    assert_eq!(controller.state(), ControllerState::Idle);

    gate.notify_one();
    let err = in_flight.await.unwrap().unwrap_err();
    assert!(matches!(err, ControllerError::Cancelled));
    // The stale response did not resurrect the session.
    assert_eq!(controller.state(), ControllerState::Idle);
    assert!(controller.current_item().is_none());
}

#[tokio::test]
async fn cancelled_controller_can_start_a_fresh_session() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::Test),
        first_item: Some(StudyItem::Question(question("1"))),
    }));
    gateway.queue_start(Ok(StartedSession {
        session: session(SessionMode::TestFlash),
        first_item: Some(StudyItem::Flash(flash_question("41"))),
    }));

    let controller = SessionController::new(Arc::clone(&gateway) as Arc<dyn SessionGateway>);
    controller
        .start(DeckId::new("D1"), SessionMode::Test, StartOptions::new())
        .await
        .unwrap();
    controller.cancel();
    assert_eq!(controller.state(), ControllerState::Idle);

    let outcome = controller
        .start(DeckId::new("D1"), SessionMode::TestFlash, StartOptions::new())
        .await
        .unwrap();
    assert!(matches!(outcome, StartOutcome::Ready(StudyItem::Flash(_))));
    assert_eq!(controller.state(), ControllerState::Presenting);
}

#[tokio::test]
async fn fetch_result_reads_the_active_session_snapshot() {
    let gateway = Arc::new(ScriptedGateway::new());
    gateway.queue_test_answer(Ok(TestAnswerResponse {
        answer: judged("1"),
        next_question: None,
        finished: Some(true),
        stats: Some(stats(100.0, 1.0, 1.0)),
    }));
    gateway.queue_result(Ok(serde_json::from_value(serde_json::json!({
        "mode": "TEST",
        "session": {"testAnswers": [{"questionId": "1", "isCorrect": true}]},
        "stats": {"totalAnswered": 1, "correctCount": 1, "progressPercent": 100},
    }))
    .unwrap()));

    let controller = started_test_controller(Arc::clone(&gateway), question("1")).await;
    controller.submit_answer(single_answer("1")).await.unwrap();

    let result = controller.fetch_result().await.unwrap();
    let SessionResult::Test(test) = result else {
        panic!("expected a TEST result");
    };
    assert_eq!(test.answers().len(), 1);
    assert_eq!(test.stats().unwrap().display_percent(), 100);
}
