//! Client-side conversation log and the per-turn send state machine.
//!
//! A turn goes `Idle -> Sending -> {Delivered, Failed}` and lands back in
//! `Idle`. The user message is only appended once the turn resolves, together
//! with either the response or one synthetic error entry. Sends are never
//! retried automatically.

use crate::messages::{ai_message, error_message, user_message};
use allianceforge_protocol::{defaults, ChatMessage, ChatRequest, ChatResponse, ChatStatus};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use std::time::Duration;

pub const SEND_FAILED_NOTICE: &str = "Failed to send message. Please try again.";
pub const STATUS_FAILED_NOTICE: &str = "Failed to connect to chat system";

pub const WELCOME_TEXT: &str = "Welcome to Alliance Strategic Communications, Commander! I'm C.O.R.E., your AI companion. I'm here to assist you on your mission to save humanity. Feel free to ask me anything about fleet management, strategy, or just chat about your progress!";

pub const CORE_ENCOURAGEMENTS: [&str; 5] = [
    "Remember Commander, every great journey begins with a single tap. Keep building that fleet!",
    "Your persistence in the face of Earth's doom is truly inspiring. The Alliance is proud to have you.",
    "Strategic tip: Consistent daily progress often yields better results than sporadic intense sessions.",
    "The stars are calling, Commander. Your leadership will guide humanity to a brighter future.",
    "Your dedication to the evacuation mission gives hope to billions. Keep up the excellent work!",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("a message is already being sent")]
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("chat request failed: {0}")]
    Request(String),
    #[error("chat API returned status {0}")]
    Status(u16),
    #[error("chat API rejected the message")]
    Rejected,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError>;
    async fn status(&self, timezone: &str) -> Result<ChatStatus, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Delivered,
    Failed,
}

/// A submitted message waiting for its response.
#[derive(Debug)]
pub struct PendingTurn {
    user: ChatMessage,
    request: ChatRequest,
}

impl PendingTurn {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

pub struct ChatThread {
    messages: Vec<ChatMessage>,
    state: TurnState,
    error: Option<String>,
    status: Option<ChatStatus>,
    timezone: String,
    display_name: String,
}

impl Default for ChatThread {
    fn default() -> Self {
        Self::new(defaults::TIMEZONE, defaults::DISPLAY_NAME)
    }
}

impl ChatThread {
    pub fn new(timezone: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            state: TurnState::Idle,
            error: None,
            status: None,
            timezone: timezone.into(),
            display_name: display_name.into(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> Option<&ChatStatus> {
        self.status.as_ref()
    }

    pub fn is_business_window(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.is_business_window)
    }

    /// Validates and enters `Sending`. Nothing is appended yet.
    pub fn begin(&mut self, text: &str) -> Result<PendingTurn, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.state == TurnState::Sending {
            return Err(ChatError::Busy);
        }
        self.state = TurnState::Sending;
        self.error = None;
        Ok(PendingTurn {
            user: user_message(&self.display_name, text),
            request: ChatRequest {
                message: Some(text.to_string()),
                timezone: Some(self.timezone.clone()),
                display_name: Some(self.display_name.clone()),
            },
        })
    }

    /// Resolves a pending turn and returns to `Idle`.
    pub fn finish(
        &mut self,
        pending: PendingTurn,
        result: Result<ChatResponse, TransportError>,
    ) -> TurnOutcome {
        self.state = TurnState::Idle;
        match result {
            Ok(resp) if resp.success => {
                self.messages.push(pending.user);
                self.messages.push(resp.response);
                TurnOutcome::Delivered
            }
            Ok(_) => self.fail(pending, &TransportError::Rejected),
            Err(err) => self.fail(pending, &err),
        }
    }

    fn fail(&mut self, pending: PendingTurn, err: &TransportError) -> TurnOutcome {
        tracing::warn!(error = %err, "chat send failed");
        self.error = Some(SEND_FAILED_NOTICE.to_string());
        self.messages.push(pending.user);
        self.messages.push(error_message());
        TurnOutcome::Failed
    }

    pub async fn submit(
        &mut self,
        transport: &dyn ChatTransport,
        text: &str,
    ) -> Result<TurnOutcome, ChatError> {
        let pending = self.begin(text)?;
        let result = transport.send(pending.request()).await;
        let window = result.as_ref().ok().map(|r| r.is_business_window);
        let outcome = self.finish(pending, result);
        if outcome == TurnOutcome::Delivered {
            let cached = self.status.as_ref().map(|s| s.is_business_window);
            if cached != window {
                self.refresh_status(transport).await;
            }
        }
        Ok(outcome)
    }

    pub async fn refresh_status(&mut self, transport: &dyn ChatTransport) -> Option<&ChatStatus> {
        match transport.status(&self.timezone).await {
            Ok(status) => {
                self.status = Some(status);
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat status fetch failed");
                self.error = Some(STATUS_FAILED_NOTICE.to_string());
            }
        }
        self.status.as_ref()
    }

    /// Prepends the C.O.R.E. greeting, stamped just before the current first entry.
    pub fn add_welcome_message(&mut self) {
        let mut welcome = ai_message(WELCOME_TEXT);
        welcome.sender_id = "core_system".to_string();
        welcome.display_name = "C.O.R.E.".to_string();
        welcome.timestamp -= 1000;
        self.messages.insert(0, welcome);
    }

    pub fn add_motivational_message<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let line = CORE_ENCOURAGEMENTS
            .choose(rng)
            .copied()
            .unwrap_or(CORE_ENCOURAGEMENTS[0]);
        self.messages.push(ai_message(line));
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Talks to the `/api/chat` endpoints of an Alliance Forge server.
#[derive(Debug, Clone)]
pub struct HttpChatTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpChatTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

fn request_error(e: reqwest::Error) -> TransportError {
    TransportError::Request(e.to_string())
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let resp = self
            .client
            .post(self.chat_url())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(request_error)?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        resp.json().await.map_err(request_error)
    }

    async fn status(&self, timezone: &str) -> Result<ChatStatus, TransportError> {
        let resp = self
            .client
            .get(self.chat_url())
            .query(&[("timezone", timezone)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(request_error)?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        resp.json().await.map_err(request_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{command_message, ERROR_SENDER_ID};
    use allianceforge_protocol::SenderKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTransport {
        fail: bool,
        business: bool,
        sends: AtomicUsize,
        status_calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(fail: bool, business: bool) -> Self {
            Self {
                fail,
                business,
                sends: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransportError::Request("connection refused".into()));
            }
            let text = request.message.clone().unwrap_or_default();
            Ok(ChatResponse {
                success: true,
                response: if self.business {
                    command_message("queued")
                } else {
                    ai_message(format!("re: {text}"))
                },
                is_business_window: self.business,
            })
        }

        async fn status(&self, timezone: &str) -> Result<ChatStatus, TransportError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatStatus {
                is_business_window: self.business,
                window_start: 9,
                window_end: 18,
                timezone: timezone.to_string(),
                ai_available: !self.business,
                system_message: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn empty_message_appends_nothing() {
        let transport = ScriptedTransport::new(false, false);
        let mut thread = ChatThread::default();
        assert_eq!(
            thread.submit(&transport, "   ").await,
            Err(ChatError::EmptyMessage)
        );
        assert!(thread.messages().is_empty());
        assert_eq!(thread.state(), TurnState::Idle);
        assert_eq!(transport.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delivered_appends_user_and_response() {
        let transport = ScriptedTransport::new(false, false);
        let mut thread = ChatThread::new("UTC", "Vega");
        let outcome = thread.submit(&transport, "  hello ").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Delivered);

        let msgs = thread.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].sender_kind, SenderKind::User);
        assert_eq!(msgs[0].content, "hello");
        assert_eq!(msgs[0].display_name, "Vega");
        assert_eq!(msgs[1].sender_kind, SenderKind::Ai);
        assert_eq!(msgs[1].content, "re: hello");
        assert!(thread.error().is_none());
        assert_eq!(thread.state(), TurnState::Idle);
    }

    #[tokio::test]
    async fn failed_appends_one_synthetic_error() {
        let transport = ScriptedTransport::new(true, false);
        let mut thread = ChatThread::default();
        let outcome = thread.submit(&transport, "hello").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Failed);

        let msgs = thread.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].sender_kind, SenderKind::User);
        assert_eq!(msgs[1].sender_kind, SenderKind::System);
        assert_eq!(msgs[1].sender_id, ERROR_SENDER_ID);
        assert_eq!(thread.error(), Some(SEND_FAILED_NOTICE));
        assert_eq!(thread.state(), TurnState::Idle);
        // No automatic retry.
        assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overlapping_sends_are_rejected() {
        let mut thread = ChatThread::default();
        let pending = thread.begin("first").unwrap();
        assert_eq!(thread.state(), TurnState::Sending);
        assert_eq!(thread.begin("second").unwrap_err(), ChatError::Busy);

        let outcome = thread.finish(pending, Err(TransportError::Status(502)));
        assert_eq!(outcome, TurnOutcome::Failed);
        assert!(thread.begin("third").is_ok());
    }

    #[test]
    fn unsuccessful_response_counts_as_failure() {
        let mut thread = ChatThread::default();
        let pending = thread.begin("hi").unwrap();
        let resp = ChatResponse {
            success: false,
            response: ai_message("ignored"),
            is_business_window: false,
        };
        assert_eq!(thread.finish(pending, Ok(resp)), TurnOutcome::Failed);
        assert!(thread.messages().iter().all(|m| m.content != "ignored"));
    }

    #[tokio::test]
    async fn status_refreshes_only_when_window_changes() {
        let transport = ScriptedTransport::new(false, true);
        let mut thread = ChatThread::default();
        thread.submit(&transport, "one").await.unwrap();
        assert_eq!(transport.status_calls.load(Ordering::SeqCst), 1);
        assert!(thread.is_business_window());

        thread.submit(&transport, "two").await.unwrap();
        assert_eq!(transport.status_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn welcome_is_prepended_and_clear_empties() {
        let mut thread = ChatThread::default();
        thread.add_motivational_message(&mut StdRng::seed_from_u64(5));
        thread.add_welcome_message();
        assert_eq!(thread.messages().len(), 2);
        assert_eq!(thread.messages()[0].content, WELCOME_TEXT);
        assert_eq!(thread.messages()[0].display_name, "C.O.R.E.");
        assert!(CORE_ENCOURAGEMENTS.contains(&thread.messages()[1].content.as_str()));

        thread.clear();
        assert!(thread.messages().is_empty());
    }
}
