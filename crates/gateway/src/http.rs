use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use study_core::model::{
    Card, CardId, DeckId, FlashQuestion, Question, Session, SessionId, SessionResult, StudyItem,
};

use crate::auth::AuthContext;
use crate::contract::{
    FlashAnswerRequest, FlashAnswerResponse, MarkCardResponse, SessionGateway,
    StartSessionRequest, StartedSession, TestAnswerRequest, TestAnswerResponse,
};
use crate::error::ApiError;

/// `SessionGateway` backed by the service's REST API.
#[derive(Clone)]
pub struct HttpSessionGateway {
    client: Client,
    base_url: Url,
    auth: AuthContext,
}

impl HttpSessionGateway {
    /// Create a gateway against the given base URL. The URL must be an
    /// http(s) origin; paths under `/api` are appended per operation.
    #[must_use]
    pub fn new(base_url: Url, auth: AuthContext) -> Self {
        Self {
            client: Client::new(),
            base_url,
            auth,
        }
    }

    /// Replace the underlying HTTP client (timeouts, proxies, ...).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let request = match self.auth.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(|err| {
            tracing::warn!(error = %err, "transport failure");
            ApiError::transport(&err)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::from_response(status.as_u16(), &body);
            tracing::warn!(status = status.as_u16(), message = err.message(), "request failed");
            return Err(err);
        }

        response.json::<T>().await.map_err(|err| {
            tracing::warn!(error = %err, "malformed response body");
            ApiError::transport(&err)
        })
    }
}

// The start endpoint answers with `nextCard` for CARD sessions and a
// `nextQuestion` of either shape for the test modes; structured questions
// are recognizable by their `type` field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionWire {
    session: Session,
    #[serde(default)]
    next_card: Option<Card>,
    #[serde(default)]
    next_question: Option<NextQuestionWire>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NextQuestionWire {
    Structured(Question),
    Flash(FlashQuestion),
}

impl StartSessionWire {
    fn into_started(self) -> StartedSession {
        let first_item = self
            .next_card
            .map(StudyItem::Card)
            .or(self.next_question.map(|question| match question {
                NextQuestionWire::Structured(question) => StudyItem::Question(question),
                NextQuestionWire::Flash(question) => StudyItem::Flash(question),
            }));

        StartedSession {
            session: self.session,
            first_item,
        }
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkCardBody<'a> {
    card_id: &'a CardId,
    known: bool,
}

#[async_trait::async_trait]
impl SessionGateway for HttpSessionGateway {
    async fn start_session(
        &self,
        deck_id: &DeckId,
        request: &StartSessionRequest,
    ) -> Result<StartedSession, ApiError> {
        let url = self.endpoint(&["decks", deck_id.as_str(), "sessions"]);
        let wire: StartSessionWire = self.execute(self.client.post(url).json(request)).await?;
        Ok(wire.into_started())
    }

    async fn mark_card(
        &self,
        session_id: &SessionId,
        card_id: &CardId,
        known: bool,
    ) -> Result<MarkCardResponse, ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "card-mark"]);
        let body = MarkCardBody { card_id, known };
        self.execute(self.client.post(url).json(&body)).await
    }

    async fn submit_test_answer(
        &self,
        session_id: &SessionId,
        request: &TestAnswerRequest,
    ) -> Result<TestAnswerResponse, ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "test-answers"]);
        self.execute(self.client.post(url).json(request)).await
    }

    async fn submit_flash_answer(
        &self,
        session_id: &SessionId,
        request: &FlashAnswerRequest,
    ) -> Result<FlashAnswerResponse, ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "flash-answers"]);
        self.execute(self.client.post(url).json(request)).await
    }

    async fn session_result(&self, session_id: &SessionId) -> Result<SessionResult, ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "result"]);
        self.execute(self.client.get(url)).await
    }

    async fn finish_session(&self, session_id: &SessionId) -> Result<Session, ApiError> {
        let url = self.endpoint(&["sessions", session_id.as_str(), "finish"]);
        self.execute(self.client.post(url)).await
    }

    async fn list_questions(
        &self,
        deck_id: &DeckId,
        share_code: Option<&str>,
    ) -> Result<Vec<Question>, ApiError> {
        let mut url = self.endpoint(&["decks", deck_id.as_str(), "questions"]);
        if let Some(code) = share_code {
            url.query_pairs_mut().append_pair("shareCode", code);
        }
        self.execute(self.client.get(url)).await
    }
}
