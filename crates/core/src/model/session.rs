use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DeckId, SessionId};

/// Study mode a session runs in. Fixed for the whole session lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionMode {
    /// Free-form card review with known/unknown marks.
    Card,
    /// Structured test over authored questions.
    Test,
    /// Timed multiple-choice test generated on the fly from cards.
    TestFlash,
}

/// Server-owned session snapshot. The client holds a read-only copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    deck_id: DeckId,
    mode: SessionMode,
    // Older backend revisions report the start timestamp as `createdAt`.
    #[serde(alias = "createdAt")]
    started_at: DateTime<Utc>,
    #[serde(default)]
    finished_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn new(
        id: SessionId,
        deck_id: DeckId,
        mode: SessionMode,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            deck_id,
            mode,
            started_at,
            finished_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> &DeckId {
        &self.deck_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// Caller-side options for starting a session.
///
/// `only_unknown` is meaningful for CARD runs, `options_count` for
/// TEST_FLASH runs; the gateway drops whichever does not apply to the
/// requested mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    share_code: Option<String>,
    only_unknown: Option<bool>,
    options_count: Option<u8>,
}

/// Bounds the server accepts for generated flash-question option counts.
pub const OPTIONS_COUNT_RANGE: (u8, u8) = (2, 8);

impl StartOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Study a shared deck through its share code.
    #[must_use]
    pub fn with_share_code(mut self, code: impl Into<String>) -> Self {
        self.share_code = Some(code.into());
        self
    }

    /// Restrict a CARD session to cards not yet marked known.
    #[must_use]
    pub fn with_only_unknown(mut self, only_unknown: bool) -> Self {
        self.only_unknown = Some(only_unknown);
        self
    }

    /// Number of choices per generated flash question, clamped to the
    /// server-accepted range before it ever reaches the session layer.
    #[must_use]
    pub fn with_options_count(mut self, count: u8) -> Self {
        let (min, max) = OPTIONS_COUNT_RANGE;
        self.options_count = Some(count.clamp(min, max));
        self
    }

    #[must_use]
    pub fn share_code(&self) -> Option<&str> {
        self.share_code.as_deref()
    }

    #[must_use]
    pub fn only_unknown(&self) -> Option<bool> {
        self.only_unknown
    }

    #[must_use]
    pub fn options_count(&self) -> Option<u8> {
        self.options_count
    }
}
