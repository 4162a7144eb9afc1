//! Mounted chat view
//!
//! A `ChatSession` exists only while the page is authenticated. Each call to
//! `submit` is an independent submission with its own state; concurrent
//! submissions are not serialized and replies append in completion order.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use simplechat_identity::{Redirect, ScopeSet, TokenOutcome, TokenProvider};
use simplechat_telemetry::Telemetry;
use simplechat_transcript::{Message, Submission, Transcript};

use crate::endpoint::ChatEndpoint;

/// What happened to a prompt
#[derive(Debug)]
#[must_use]
pub enum SubmitOutcome {
    /// Blank prompt; nothing was recorded or sent
    Rejected,
    Replied(Message),
    /// The fixed error reply was appended
    Failed(Message),
    /// Token acquisition navigated away. The current page is done.
    Redirect(Redirect),
}

pub struct ChatSession {
    transcript: Transcript,
    tokens: TokenProvider,
    scopes: ScopeSet,
    endpoint: Arc<dyn ChatEndpoint>,
    telemetry: Telemetry,
    input: Arc<Mutex<String>>,
    /// Submissions between idle and done, by id
    in_flight: Arc<Mutex<HashMap<String, Submission>>>,
}

impl ChatSession {
    pub fn new(
        tokens: TokenProvider,
        scopes: ScopeSet,
        endpoint: Arc<dyn ChatEndpoint>,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            transcript: Transcript::new(),
            tokens,
            scopes,
            endpoint,
            telemetry,
            input: Arc::new(Mutex::new(String::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    pub fn input(&self) -> String {
        self.input.lock().clone()
    }

    pub fn set_input(&self, text: &str) {
        *self.input.lock() = text.to_string();
    }

    /// Number of submissions still sending
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Submit what the input buffer holds right now. The returned future owns
    /// its prompt, so later edits to the buffer do not change it.
    pub fn submit_input(&self) -> impl Future<Output = SubmitOutcome> + Send + 'static {
        let session = self.clone();
        let prompt = self.input();
        async move { session.submit(&prompt).await }
    }

    pub async fn submit(&self, prompt: &str) -> SubmitOutcome {
        let Ok(mut submission) = Submission::new(prompt) else {
            tracing::debug!("Blank prompt ignored");
            return SubmitOutcome::Rejected;
        };

        self.transcript.append(Message::user(prompt));

        if let Err(e) = submission.start() {
            tracing::warn!(submission_id = %submission.id, error = %e, "Submission not started");
        }
        let id = submission.id.clone();
        self.in_flight.lock().insert(id.clone(), submission);

        let outcome = self.exchange(prompt).await;

        if let Some(mut submission) = self.in_flight.lock().remove(&id) {
            if let Err(e) = submission.finish() {
                tracing::warn!(submission_id = %id, error = %e, "Submission not finished");
            }
            tracing::debug!(
                submission_id = %id,
                elapsed_ms = submission.elapsed_ms(),
                "Submission finished"
            );
        }
        {
            // A draft typed while this prompt was sending stays
            let mut input = self.input.lock();
            if *input == prompt {
                input.clear();
            }
        }

        outcome
    }

    async fn exchange(&self, prompt: &str) -> SubmitOutcome {
        let token = match self.tokens.acquire(&self.scopes).await {
            TokenOutcome::Token(token) => Some(token),
            TokenOutcome::Anonymous => None,
            TokenOutcome::Unavailable(e) => {
                tracing::warn!(error = %e, "Sending prompt without a token");
                None
            }
            TokenOutcome::Redirect(redirect) => {
                tracing::info!(kind = %redirect.kind(), "Prompt interrupted by interactive sign-in");
                return SubmitOutcome::Redirect(redirect);
            }
        };

        match self.endpoint.send(prompt, token.as_ref()).await {
            Ok(reply) => {
                let message = Message::assistant(reply.response);
                self.transcript.append(message.clone());
                self.telemetry.track_event("PromptAnswered", &[]);
                SubmitOutcome::Replied(message)
            }
            Err(e) => {
                tracing::error!(error = %e, "Chat request failed");
                self.telemetry.track_exception(e.type_name(), &e.to_string());
                let message = Message::error_reply();
                self.transcript.append(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}

impl Clone for ChatSession {
    fn clone(&self) -> Self {
        Self {
            transcript: self.transcript.clone(),
            tokens: self.tokens.clone(),
            scopes: self.scopes.clone(),
            endpoint: Arc::clone(&self.endpoint),
            telemetry: self.telemetry.clone(),
            input: Arc::clone(&self.input),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockito::Matcher;
    use simplechat_identity::testing::{SilentBehavior, StaticIdentity};
    use simplechat_identity::{Account, RedirectKind, TokenHandle};
    use simplechat_telemetry::MemorySink;
    use simplechat_transcript::{Origin, ERROR_REPLY};

    use crate::endpoint::{ChatReply, HttpChatEndpoint};
    use crate::error::ChatError;

    fn signed_in(silent: SilentBehavior) -> Arc<StaticIdentity> {
        Arc::new(
            StaticIdentity::new()
                .with_active(Account::new("a.t", "alice@contoso.com"))
                .with_silent(silent),
        )
    }

    fn api_scopes() -> ScopeSet {
        ScopeSet::parse("api://chat/Chat.Send")
    }

    fn http_session(
        server: &mockito::Server,
        identity: Arc<StaticIdentity>,
        scopes: ScopeSet,
    ) -> ChatSession {
        let telemetry = Telemetry::new();
        let endpoint =
            HttpChatEndpoint::new(&format!("{}/chat", server.url()), telemetry.clone()).unwrap();
        ChatSession::new(TokenProvider::new(identity), scopes, Arc::new(endpoint), telemetry)
    }

    /// Records how many messages the transcript held when each call arrived
    struct ObservingEndpoint {
        transcript: Mutex<Option<Transcript>>,
        seen_lengths: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl ChatEndpoint for ObservingEndpoint {
        async fn send(&self, prompt: &str, _token: Option<&TokenHandle>) -> crate::Result<ChatReply> {
            if let Some(transcript) = self.transcript.lock().as_ref() {
                self.seen_lengths.lock().push(transcript.len());
            }
            Ok(ChatReply {
                response: format!("echo: {prompt}"),
            })
        }
    }

    #[tokio::test]
    async fn test_blank_prompts_are_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/chat").expect(0).create_async().await;
        let identity = signed_in(SilentBehavior::Token("tok".into()));
        let session = http_session(&server, identity.clone(), api_scopes());

        for prompt in ["", " ", "\t\n  "] {
            assert!(matches!(session.submit(prompt).await, SubmitOutcome::Rejected));
        }

        assert!(session.transcript().is_empty());
        assert_eq!(identity.calls().silent, 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_user_message_precedes_network_call() {
        let endpoint = Arc::new(ObservingEndpoint {
            transcript: Mutex::new(None),
            seen_lengths: Mutex::new(Vec::new()),
        });
        let session = ChatSession::new(
            TokenProvider::new(signed_in(SilentBehavior::Token("tok".into()))),
            api_scopes(),
            endpoint.clone(),
            Telemetry::new(),
        );
        *endpoint.transcript.lock() = Some(session.transcript().clone());

        let _ = session.submit("first").await;
        let _ = session.submit("second").await;

        // Exactly one new user message each time the endpoint was reached
        assert_eq!(*endpoint.seen_lengths.lock(), vec![1, 3]);
        let messages = session.transcript().messages();
        assert_eq!(messages[0].origin(), Origin::User);
        assert_eq!(messages[1].text(), "echo: first");
        assert_eq!(messages[2].origin(), Origin::User);
    }

    #[tokio::test]
    async fn test_reply_is_appended() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(serde_json::json!({ "prompt": "hi" })))
            .with_status(200)
            .with_body(r#"{"response":"hello"}"#)
            .expect(1)
            .create_async()
            .await;
        let session = http_session(&server, signed_in(SilentBehavior::Token("tok".into())), api_scopes());
        session.set_input("hi");

        match session.submit_input().await {
            SubmitOutcome::Replied(message) => assert_eq!(message.text(), "hello"),
            other => panic!("Expected reply, got {other:?}"),
        }

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), "hi");
        assert_eq!(messages[1].origin(), Origin::Assistant);
        assert_eq!(messages[1].text(), "hello");
        assert!(session.input().is_empty());
        assert_eq!(session.in_flight(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_scopes_send_no_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"response":"anonymous"}"#)
            .expect(2)
            .create_async()
            .await;
        let identity = signed_in(SilentBehavior::Token("tok".into()));
        let session = http_session(&server, identity.clone(), ScopeSet::new());

        let _ = session.submit("one").await;
        let _ = session.submit("two").await;

        assert_eq!(identity.calls().silent, 0);
        assert_eq!(session.transcript().len(), 4);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_appends_error_reply() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(502)
            .create_async()
            .await;

        let sink = MemorySink::new();
        let telemetry = Telemetry::new();
        telemetry.initialize_with_sink("InstrumentationKey=k", Arc::new(sink.clone()));
        let endpoint =
            HttpChatEndpoint::new(&format!("{}/chat", server.url()), telemetry.clone()).unwrap();
        let session = ChatSession::new(
            TokenProvider::new(signed_in(SilentBehavior::Token("tok".into()))),
            api_scopes(),
            Arc::new(endpoint),
            telemetry,
        );
        session.set_input("hi");

        assert!(matches!(session.submit("hi").await, SubmitOutcome::Failed(_)));

        let assistant: Vec<_> = session
            .transcript()
            .messages()
            .into_iter()
            .filter(|m| m.origin() == Origin::Assistant)
            .collect();
        assert_eq!(assistant.len(), 1);
        assert_eq!(assistant[0].text(), ERROR_REPLY);
        assert!(session.input().is_empty());
        assert_eq!(session.in_flight(), 0);
        assert_eq!(sink.kinds(), ["Pageview", "Exception"]);
    }

    #[tokio::test]
    async fn test_network_failure_appends_error_reply() {
        // Nothing listens on the discard port
        let endpoint = HttpChatEndpoint::new("http://127.0.0.1:9/chat", Telemetry::new()).unwrap();
        let session = ChatSession::new(
            TokenProvider::new(signed_in(SilentBehavior::Token("tok".into()))),
            api_scopes(),
            Arc::new(endpoint),
            Telemetry::new(),
        );

        match session.submit("hi").await {
            SubmitOutcome::Failed(message) => assert!(message.is_error_reply()),
            other => panic!("Expected failure, got {other:?}"),
        }
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_appends_error_reply() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;
        let session = http_session(&server, signed_in(SilentBehavior::Token("tok".into())), api_scopes());

        assert!(matches!(session.submit("hi").await, SubmitOutcome::Failed(_)));
        assert_eq!(session.transcript().last().map(|m| m.is_error_reply()), Some(true));
    }

    #[tokio::test]
    async fn test_soft_token_failure_sends_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"response":"degraded"}"#)
            .create_async()
            .await;
        let session = http_session(&server, signed_in(SilentBehavior::Fail), api_scopes());

        assert!(matches!(session.submit("hi").await, SubmitOutcome::Replied(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_interaction_required_stops_the_flow() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/chat").expect(0).create_async().await;
        let identity = signed_in(SilentBehavior::InteractionRequired);
        let session = http_session(&server, identity.clone(), api_scopes());

        match session.submit("hi").await {
            SubmitOutcome::Redirect(redirect) => assert_eq!(redirect.kind(), RedirectKind::Consent),
            other => panic!("Expected redirect, got {other:?}"),
        }

        // Only the optimistic user message
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(identity.calls().interactive, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_traceparent_sent_when_telemetry_active() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header(
                "traceparent",
                Matcher::Regex(r"^00-[0-9a-f]{32}-[0-9a-f]{16}-01$".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"response":"traced"}"#)
            .create_async()
            .await;

        let telemetry = Telemetry::new();
        telemetry.initialize_with_sink("InstrumentationKey=k", Arc::new(MemorySink::new()));
        let endpoint =
            HttpChatEndpoint::new(&format!("{}/chat", server.url()), telemetry.clone()).unwrap();
        let session = ChatSession::new(
            TokenProvider::new(signed_in(SilentBehavior::Token("tok".into()))),
            ScopeSet::new(),
            Arc::new(endpoint),
            telemetry,
        );

        assert!(matches!(session.submit("hi").await, SubmitOutcome::Replied(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_submissions_race() {
        let endpoint = Arc::new(ObservingEndpoint {
            transcript: Mutex::new(None),
            seen_lengths: Mutex::new(Vec::new()),
        });
        let session = ChatSession::new(
            TokenProvider::new(signed_in(SilentBehavior::Token("tok".into()))),
            ScopeSet::new(),
            endpoint,
            Telemetry::new(),
        );

        let (a, b) = tokio::join!(session.submit("a"), session.submit("b"));
        assert!(matches!(a, SubmitOutcome::Replied(_)));
        assert!(matches!(b, SubmitOutcome::Replied(_)));

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(
            messages.iter().filter(|m| m.origin() == Origin::User).count(),
            2
        );
        assert_eq!(session.in_flight(), 0);
    }

    /// Holds every reply until released
    struct GatedEndpoint {
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl ChatEndpoint for GatedEndpoint {
        async fn send(&self, _prompt: &str, _token: Option<&TokenHandle>) -> crate::Result<ChatReply> {
            self.gate.notified().await;
            Ok(ChatReply {
                response: "late".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_draft_survives_pending_reply() {
        let endpoint = Arc::new(GatedEndpoint {
            gate: tokio::sync::Notify::new(),
        });
        let session = ChatSession::new(
            TokenProvider::new(signed_in(SilentBehavior::Token("tok".into()))),
            ScopeSet::new(),
            endpoint.clone(),
            Telemetry::new(),
        );

        session.set_input("hi");
        let pending = tokio::spawn(session.submit_input());
        while session.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        session.set_input("draft");
        endpoint.gate.notify_one();

        assert!(matches!(pending.await.unwrap(), SubmitOutcome::Replied(_)));
        assert_eq!(session.input(), "draft");
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn test_error_type_names() {
        let err = ChatError::Status {
            status: 500,
            body: String::new(),
        };
        assert_eq!(err.type_name(), "HttpStatusError");
    }
}
