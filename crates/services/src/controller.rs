use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gateway::{
    ApiError, FlashAnswerRequest, SessionGateway, StartSessionRequest, TestAnswerRequest,
};
use study_core::model::{
    AnswerSubmission, DeckId, Session, SessionId, SessionMode, SessionResult, SessionStats,
    StartOptions, StudyItem,
};
use study_core::progress::{self, ProgressInputs};

use crate::error::ControllerError;
use crate::resync::{ResyncEngine, ResyncOutcome};

/// Lifecycle of one session instance.
///
/// `Finished` and `Failed` are terminal; a controller can be reused for a
/// fresh session only after `cancel()` returns it to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Presenting,
    Submitting,
    Resyncing,
    Finished,
    Failed,
}

impl ControllerState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ControllerState::Finished | ControllerState::Failed)
    }
}

/// How a successful `start` left the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The first item is up; the controller is `Presenting`.
    Ready(StudyItem),
    /// CARD start with nothing to review; the controller is `Finished`
    /// with zero progress.
    AlreadyFinished,
}

/// How a successful `submit_answer` left the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The answer landed; the next item is up.
    Next(StudyItem),
    /// The answer was lost to a desync, but the true current item was
    /// recovered without re-submitting; the controller is `Presenting`.
    Resynced(StudyItem),
    /// The session is over.
    Finished,
}

struct Inner {
    state: ControllerState,
    // Bumped by cancel() and start(); an in-flight call whose epoch no
    // longer matches discards its outcome instead of mutating state.
    epoch: u64,
    session: Option<Session>,
    deck_id: Option<DeckId>,
    share_code: Option<String>,
    current: Option<StudyItem>,
    progress: ProgressInputs,
    finish_pending: bool,
}

impl Inner {
    fn reset(&mut self) {
        self.state = ControllerState::Idle;
        self.session = None;
        self.deck_id = None;
        self.share_code = None;
        self.current = None;
        self.progress = ProgressInputs::default();
        self.finish_pending = false;
    }
}

// Everything the submit path needs across its suspension points.
struct SubmitContext {
    epoch: u64,
    session_id: SessionId,
    mode: SessionMode,
    deck_id: Option<DeckId>,
    share_code: Option<String>,
}

// Mode-normalized view of the three submit responses.
struct SubmitReply {
    finished: bool,
    next: Option<StudyItem>,
    progress: Option<ProgressInputs>,
}

/// Drives one learning session end-to-end: start, present, submit, advance,
/// recover from desync, finish.
///
/// All methods take `&self`; internal state sits behind a mutex that is
/// never held across an await. At most one mutating call is in flight per
/// session: submissions during `Submitting` or `Resyncing` are rejected
/// synchronously rather than queued.
pub struct SessionController {
    gateway: Arc<dyn SessionGateway>,
    resync: ResyncEngine,
    inner: Mutex<Inner>,
}

impl SessionController {
    #[must_use]
    pub fn new(gateway: Arc<dyn SessionGateway>) -> Self {
        let resync = ResyncEngine::new(Arc::clone(&gateway));
        Self {
            gateway,
            resync,
            inner: Mutex::new(Inner {
                state: ControllerState::Idle,
                epoch: 0,
                session: None,
                deck_id: None,
                share_code: None,
                current: None,
                progress: ProgressInputs::default(),
                finish_pending: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Re-acquire the lock after an await; fails if cancel()/start() raced us.
    fn claim(&self, epoch: u64) -> Result<MutexGuard<'_, Inner>, ControllerError> {
        let inner = self.lock();
        if inner.epoch != epoch {
            return Err(ControllerError::Cancelled);
        }
        Ok(inner)
    }

    #[must_use]
    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    #[must_use]
    pub fn current_item(&self) -> Option<StudyItem> {
        self.lock().current.clone()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// True when a finished CARD session still owes the server its explicit
    /// finish call; `retry_finish` is the only way forward.
    #[must_use]
    pub fn finish_pending(&self) -> bool {
        self.lock().finish_pending
    }

    /// Stable percentage for display, reconciled from the latest
    /// server-reported progress fields.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        progress::compute(self.lock().progress)
    }

    /// Open a session on the deck and present its first item.
    ///
    /// # Errors
    ///
    /// Returns `ControllerError::InvalidState` outside `Idle`,
    /// `MissingFirstItem` when a test-mode start carries no question, and
    /// the gateway error verbatim on failure (controller ends up `Failed`).
    pub async fn start(
        &self,
        deck_id: DeckId,
        mode: SessionMode,
        options: StartOptions,
    ) -> Result<StartOutcome, ControllerError> {
        let epoch = {
            let mut inner = self.lock();
            if inner.state != ControllerState::Idle {
                return Err(ControllerError::InvalidState(inner.state));
            }
            inner.reset();
            inner.state = ControllerState::Starting;
            inner.epoch += 1;
            inner.deck_id = Some(deck_id.clone());
            inner.share_code = options.share_code().map(str::to_owned);
            inner.epoch
        };

        let request = StartSessionRequest::new(mode, &options);
        let started = self.gateway.start_session(&deck_id, &request).await;

        let mut inner = self.claim(epoch)?;
        let started = match started {
            Ok(started) => started,
            Err(err) => {
                inner.state = ControllerState::Failed;
                return Err(err.into());
            }
        };

        inner.session = Some(started.session);
        match started.first_item {
            Some(item) if item.matches_mode(mode) => {
                inner.current = Some(item.clone());
                inner.state = ControllerState::Presenting;
                Ok(StartOutcome::Ready(item))
            }
            None if mode == SessionMode::Card => {
                // Empty or fully-known deck: a valid, already-done session.
                inner.state = ControllerState::Finished;
                Ok(StartOutcome::AlreadyFinished)
            }
            _ => {
                inner.state = ControllerState::Failed;
                Err(ControllerError::MissingFirstItem(mode))
            }
        }
    }

    /// Submit an answer for the current item.
    ///
    /// # Errors
    ///
    /// Returns `Busy` while another mutating call is in flight,
    /// `InvalidState` outside `Presenting`, `Answer` for local shape
    /// mismatches (nothing sent), `Finish` when a finished CARD session
    /// could not be closed (retry with `retry_finish`), and the gateway
    /// error otherwise — in which case the session returns to `Presenting`
    /// and the same or a different answer may be retried.
    pub async fn submit_answer(
        &self,
        answer: AnswerSubmission,
    ) -> Result<SubmitOutcome, ControllerError> {
        let ctx = {
            let mut inner = self.lock();
            match inner.state {
                ControllerState::Presenting => {}
                ControllerState::Submitting | ControllerState::Resyncing => {
                    return Err(ControllerError::Busy);
                }
                state => return Err(ControllerError::InvalidState(state)),
            }
            let (Some(item), Some(session)) = (inner.current.as_ref(), inner.session.as_ref())
            else {
                return Err(ControllerError::InvalidState(inner.state));
            };
            answer.validate_for(item)?;

            let ctx = SubmitContext {
                epoch: inner.epoch,
                session_id: session.id().clone(),
                mode: session.mode(),
                deck_id: inner.deck_id.clone(),
                share_code: inner.share_code.clone(),
            };
            inner.state = ControllerState::Submitting;
            ctx
        };

        match self.dispatch(&ctx.session_id, &answer).await {
            Ok(reply) => self.apply_reply(&ctx, reply).await,
            Err(err) if err.is_desync() && ctx.mode != SessionMode::Card => {
                self.attempt_resync(&ctx, err).await
            }
            Err(err) => {
                if !err.is_desync() {
                    tracing::warn!(
                        session = %ctx.session_id,
                        status = ?err.status(),
                        message = err.message(),
                        "submit failed with unclassified error"
                    );
                }
                let mut inner = self.claim(ctx.epoch)?;
                inner.state = ControllerState::Presenting;
                Err(err.into())
            }
        }
    }

    // One mutating call per mode, normalized into a SubmitReply.
    async fn dispatch(
        &self,
        session_id: &SessionId,
        answer: &AnswerSubmission,
    ) -> Result<SubmitReply, ApiError> {
        match answer {
            AnswerSubmission::CardMark { card_id, known } => {
                let response = self.gateway.mark_card(session_id, card_id, *known).await?;
                Ok(SubmitReply {
                    finished: response.finished.unwrap_or(false),
                    next: response.next_card.map(StudyItem::Card),
                    progress: Some(ProgressInputs {
                        progress_percent: response.progress,
                        correct: None,
                        total: None,
                    }),
                })
            }
            AnswerSubmission::Test(answer) => {
                let request = TestAnswerRequest::from(answer);
                let response = self
                    .gateway
                    .submit_test_answer(session_id, &request)
                    .await?;
                Ok(SubmitReply {
                    finished: response.finished.unwrap_or(false),
                    next: response.next_question.map(StudyItem::Question),
                    progress: response.stats.as_ref().map(SessionStats::progress_inputs),
                })
            }
            AnswerSubmission::Flash(answer) => {
                let request = FlashAnswerRequest::from(answer);
                let response = self
                    .gateway
                    .submit_flash_answer(session_id, &request)
                    .await?;
                Ok(SubmitReply {
                    finished: response.finished,
                    next: response.next_question.map(StudyItem::Flash),
                    progress: response.stats.as_ref().map(SessionStats::progress_inputs),
                })
            }
        }
    }

    async fn apply_reply(
        &self,
        ctx: &SubmitContext,
        reply: SubmitReply,
    ) -> Result<SubmitOutcome, ControllerError> {
        {
            let mut inner = self.claim(ctx.epoch)?;
            if let Some(progress) = reply.progress {
                inner.progress = progress;
            }
        }

        match reply.next {
            Some(item) if !reply.finished => {
                let mut inner = self.claim(ctx.epoch)?;
                inner.current = Some(item.clone());
                inner.state = ControllerState::Presenting;
                Ok(SubmitOutcome::Next(item))
            }
            _ => {
                if !reply.finished {
                    // Neither a next item nor a finished flag: close rather
                    // than leave the user stuck on a spent session.
                    tracing::debug!(
                        session = %ctx.session_id,
                        "submit response carried neither next item nor finished flag; closing"
                    );
                }
                self.complete(ctx).await
            }
        }
    }

    // The session is done from the server's point of view. CARD sessions
    // are not closed until the explicit finish call lands.
    async fn complete(&self, ctx: &SubmitContext) -> Result<SubmitOutcome, ControllerError> {
        if ctx.mode != SessionMode::Card {
            let mut inner = self.claim(ctx.epoch)?;
            inner.current = None;
            inner.state = ControllerState::Finished;
            return Ok(SubmitOutcome::Finished);
        }

        match self.gateway.finish_session(&ctx.session_id).await {
            Ok(closed) => {
                let mut inner = self.claim(ctx.epoch)?;
                inner.session = Some(closed);
                inner.current = None;
                inner.finish_pending = false;
                inner.state = ControllerState::Finished;
                Ok(SubmitOutcome::Finished)
            }
            Err(err) => {
                let mut inner = self.claim(ctx.epoch)?;
                inner.finish_pending = true;
                // Still Submitting: the mark landed, only the close is owed.
                Err(ControllerError::Finish(err))
            }
        }
    }

    /// Retry the finish call of a CARD session whose mark landed but whose
    /// close did not. Re-submitting the mark instead would double-count it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no finish is pending, and `Finish` when
    /// the call fails again (state is unchanged; keep retrying).
    pub async fn retry_finish(&self) -> Result<(), ControllerError> {
        let (epoch, session_id) = {
            let inner = self.lock();
            if inner.state != ControllerState::Submitting || !inner.finish_pending {
                return Err(ControllerError::InvalidState(inner.state));
            }
            let Some(session) = inner.session.as_ref() else {
                return Err(ControllerError::InvalidState(inner.state));
            };
            (inner.epoch, session.id().clone())
        };

        match self.gateway.finish_session(&session_id).await {
            Ok(closed) => {
                let mut inner = self.claim(epoch)?;
                inner.session = Some(closed);
                inner.current = None;
                inner.finish_pending = false;
                inner.state = ControllerState::Finished;
                Ok(())
            }
            Err(err) => {
                // Epoch check only; state is untouched so the retry stays open.
                drop(self.claim(epoch)?);
                Err(ControllerError::Finish(err))
            }
        }
    }

    async fn attempt_resync(
        &self,
        ctx: &SubmitContext,
        original: ApiError,
    ) -> Result<SubmitOutcome, ControllerError> {
        {
            let mut inner = self.claim(ctx.epoch)?;
            inner.state = ControllerState::Resyncing;
        }
        tracing::debug!(
            session = %ctx.session_id,
            message = original.message(),
            "attempting resync after ambiguous submit failure"
        );

        let outcome = match ctx.mode {
            SessionMode::TestFlash => self.resync.resync_flash(&ctx.session_id).await,
            SessionMode::Test => match ctx.deck_id.as_ref() {
                Some(deck_id) => {
                    self.resync
                        .resync_test(&ctx.session_id, deck_id, ctx.share_code.as_deref())
                        .await
                }
                None => Ok(ResyncOutcome::NotPossible),
            },
            SessionMode::Card => Ok(ResyncOutcome::NotPossible),
        };

        match outcome {
            Ok(ResyncOutcome::Next(item)) => {
                let mut inner = self.claim(ctx.epoch)?;
                inner.current = Some(item.clone());
                inner.state = ControllerState::Presenting;
                Ok(SubmitOutcome::Resynced(item))
            }
            Ok(ResyncOutcome::Finished) => {
                let mut inner = self.claim(ctx.epoch)?;
                inner.current = None;
                inner.state = ControllerState::Finished;
                Ok(SubmitOutcome::Finished)
            }
            Ok(ResyncOutcome::NotPossible) | Err(_) => {
                // The original submission error is what the user sees.
                let mut inner = self.claim(ctx.epoch)?;
                inner.state = ControllerState::Presenting;
                Err(original.into())
            }
        }
    }

    /// Abandon the session client-side and return to `Idle`.
    ///
    /// No finish call is made: abandoned sessions stay open server-side.
    /// That is a documented limitation of the upstream contract, not
    /// something this layer papers over. No-op in terminal states.
    pub fn cancel(&self) {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return;
        }
        inner.epoch += 1;
        inner.reset();
    }

    /// Fetch the result snapshot for the active session. Read-only; pair
    /// with [`SessionStats::display_percent`] for display.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no session is held, and the gateway
    /// error on fetch failure.
    pub async fn fetch_result(&self) -> Result<SessionResult, ControllerError> {
        let session_id = {
            let inner = self.lock();
            let Some(session) = inner.session.as_ref() else {
                return Err(ControllerError::InvalidState(inner.state));
            };
            session.id().clone()
        };
        Ok(self.gateway.session_result(&session_id).await?)
    }
}
