use serde_json::Value;
use thiserror::Error;

/// Normalized error for every remote operation.
///
/// Transport failures, HTTP error bodies, and malformed payloads all collapse
/// into this shape before reaching callers; nothing above the gateway sees a
/// `reqwest` error.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status: Option<u16>,
    code: Option<String>,
    details: Option<Value>,
}

/// Structured codes the server uses for failures that are recoverable by a
/// resync. Preferred over message matching when present.
const DESYNC_CODES: [&str; 3] = ["INTERNAL_ERROR", "NOT_CURRENT_STEP", "QUESTION_ALREADY_ANSWERED"];

/// Message fragments that identify the same failures on backends that only
/// return free-form messages. The upstream error vocabulary is not
/// contractually stable, so matching is substring and case-insensitive.
const DESYNC_SIGNATURES: [&str; 3] = [
    "internal server error",
    "question is not the current step",
    "question already answered",
];

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Normalize a transport-level failure (connection, timeout, decode).
    #[must_use]
    pub fn transport(source: &reqwest::Error) -> Self {
        Self {
            message: source.to_string(),
            status: source.status().map(|status| status.as_u16()),
            code: None,
            details: None,
        }
    }

    /// Normalize a non-success HTTP response from its status and raw body.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let details: Option<Value> = serde_json::from_str(body).ok();
        let field = |name: &str| {
            details
                .as_ref()
                .and_then(|value| value.get(name))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        Self {
            message: field("message")
                .unwrap_or_else(|| format!("request failed with status {status}")),
            status: Some(status),
            code: field("code"),
            details,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Whether this failure signals client/server desynchronization and is
    /// worth a read-only resync instead of being surfaced as terminal.
    ///
    /// A structured `code` from the server decides when available; the
    /// message-substring check is a compatibility shim for backends without
    /// one.
    #[must_use]
    pub fn is_desync(&self) -> bool {
        if let Some(code) = self.code.as_deref() {
            return DESYNC_CODES.contains(&code);
        }

        let message = self.message.to_lowercase();
        DESYNC_SIGNATURES
            .iter()
            .any(|signature| message.contains(signature))
    }
}
