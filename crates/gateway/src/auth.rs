use std::fmt;

/// Credentials attached to outgoing requests.
///
/// Passed explicitly at gateway construction instead of being read from
/// ambient state, so hosts can scope tokens per gateway instance and tests
/// can run anonymously.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    /// No credentials; requests go out without an Authorization header.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Bearer-token credentials.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
