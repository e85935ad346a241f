//! Shared error types for the services crate.

use thiserror::Error;

use gateway::ApiError;
use study_core::model::{AnswerError, SessionMode};

use crate::controller::ControllerState;

/// Errors emitted by `SessionController`.
///
/// Everything here resolves to a retryable state: `Api` and `Finish` leave
/// the session alive (`Presenting` and `Submitting` respectively), the
/// local variants never touch the network at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error("operation is not valid while the session is {0:?}")]
    InvalidState(ControllerState),

    #[error("another mutating call is already in flight")]
    Busy,

    #[error("session was cancelled while a call was in flight")]
    Cancelled,

    #[error("start response did not carry a usable first item for {0:?} mode")]
    MissingFirstItem(SessionMode),

    #[error("finishing the session failed: {0}")]
    Finish(#[source] ApiError),

    #[error(transparent)]
    Answer(#[from] AnswerError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
