//! Business-hours routing between the human support queue and C.O.R.E.

use crate::messages::{ai_message, command_message};
use crate::reply::{fallback_reply, ReplyBackend, CORE_PERSONA_PROMPT};
use crate::window::{classify_window, BusinessHours, Clock};
use allianceforge_protocol::{ChatMessage, ChatStatus};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

pub const HUMAN_QUEUE_NOTICE: &str = "Alliance Command: Human agents are currently available (9 AM - 6 PM). Your message has been logged and will be reviewed by our support team. For immediate assistance with game mechanics, C.O.R.E. AI will be available after business hours.";

pub const STATUS_HUMANS_AVAILABLE: &str =
    "Human agents are currently available. Messages will be reviewed by our support team.";
pub const STATUS_AI_ONLINE: &str = "C.O.R.E. AI is online and ready to assist you.";

pub struct ChatRouter {
    backend: Option<Arc<dyn ReplyBackend>>,
    hours: BusinessHours,
    rng: Mutex<StdRng>,
}

impl ChatRouter {
    pub fn new(backend: Option<Arc<dyn ReplyBackend>>) -> Self {
        Self {
            backend,
            hours: BusinessHours::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic fallback selection, for tests and reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_hours(mut self, hours: BusinessHours) -> Self {
        self.hours = hours;
        self
    }

    pub fn hours(&self) -> BusinessHours {
        self.hours
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_business_window(&self, clock: &dyn Clock, timezone: &str) -> bool {
        classify_window(clock.now(), timezone, self.hours).is_business_window
    }

    pub fn status(&self, clock: &dyn Clock, timezone: &str) -> ChatStatus {
        let open = self.is_business_window(clock, timezone);
        ChatStatus {
            is_business_window: open,
            window_start: self.hours.start,
            window_end: self.hours.end,
            timezone: timezone.to_string(),
            ai_available: !open,
            system_message: if open {
                STATUS_HUMANS_AVAILABLE
            } else {
                STATUS_AI_ONLINE
            }
            .to_string(),
        }
    }

    /// Never fails and never returns blank text: backend errors and empty
    /// replies fold into the templated fallback.
    pub async fn generate_reply(&self, user_text: &str) -> String {
        if let Some(backend) = &self.backend {
            match backend.generate(CORE_PERSONA_PROMPT, user_text).await {
                Ok(text) if !text.trim().is_empty() => return text.trim().to_string(),
                Ok(_) => tracing::warn!("reply backend returned blank text, using fallback"),
                Err(err) => tracing::warn!(error = %err, "reply backend failed, using fallback"),
            }
        }
        self.fallback(user_text)
    }

    pub async fn route_message(&self, user_text: &str, is_business_window: bool) -> ChatMessage {
        if is_business_window {
            tracing::debug!("business window, queueing for human agents");
            return command_message(HUMAN_QUEUE_NOTICE);
        }
        ai_message(self.generate_reply(user_text).await)
    }

    fn fallback(&self, user_text: &str) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        fallback_reply(user_text, &mut *rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::{BackendError, MOTIVATIONAL_LINES};
    use crate::window::FixedClock;
    use allianceforge_protocol::SenderKind;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ReplyBackend for CountingBackend {
        async fn generate(&self, prompt: &str, user_text: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(prompt, CORE_PERSONA_PROMPT);
            if self.fail {
                return Err(BackendError::Status(503));
            }
            Ok(format!("  Copy that: {user_text}  ").trim().to_string())
        }
    }

    struct FixedBackend(&'static str);

    #[async_trait]
    impl ReplyBackend for FixedBackend {
        async fn generate(&self, _prompt: &str, _user_text: &str) -> Result<String, BackendError> {
            Ok(self.0.to_string())
        }
    }

    fn fixed_router(text: &'static str) -> ChatRouter {
        ChatRouter::new(Some(Arc::new(FixedBackend(text)) as Arc<dyn ReplyBackend>)).with_seed(2)
    }

    fn router_with(backend: Arc<CountingBackend>) -> ChatRouter {
        ChatRouter::new(Some(backend as Arc<dyn ReplyBackend>)).with_seed(3)
    }

    #[tokio::test]
    async fn business_window_never_calls_backend() {
        let backend = Arc::new(CountingBackend::default());
        let router = router_with(backend.clone());
        let msg = router.route_message("help", true).await;
        assert_eq!(msg.sender_kind, SenderKind::System);
        assert!(msg.content.contains("Human agents"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn after_hours_uses_backend_text() {
        let backend = Arc::new(CountingBackend::default());
        let router = router_with(backend.clone());
        let msg = router.route_message("status report", false).await;
        assert_eq!(msg.sender_kind, SenderKind::Ai);
        assert_eq!(msg.content, "Copy that: status report");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_backend_falls_back() {
        let backend = Arc::new(CountingBackend {
            fail: true,
            ..Default::default()
        });
        let router = router_with(backend.clone());
        let reply = router.generate_reply("hello").await;
        assert!(!reply.is_empty());
        assert!(reply.contains("hello"));
        assert!(MOTIVATIONAL_LINES.iter().any(|l| reply.contains(l)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_backend_falls_back() {
        let router = ChatRouter::new(None).with_seed(9);
        let msg = router.route_message("hello", false).await;
        assert_eq!(msg.sender_kind, SenderKind::Ai);
        assert!(msg.content.contains("hello"));
        assert!(MOTIVATIONAL_LINES.iter().any(|l| msg.content.contains(l)));
    }

    #[tokio::test]
    async fn backend_text_is_trimmed() {
        let router = fixed_router("  Onward  \n");
        assert_eq!(router.generate_reply("hello").await, "Onward");
    }

    #[tokio::test]
    async fn blank_backend_text_falls_back() {
        let router = fixed_router("   \n");
        let reply = router.generate_reply("hello").await;
        assert!(reply.contains("\"hello\""));
        assert!(MOTIVATIONAL_LINES.iter().any(|l| reply.contains(l)));

        let msg = router.route_message("hello", false).await;
        assert!(!msg.content.trim().is_empty());
    }

    #[test]
    fn status_reflects_window() {
        let router = ChatRouter::new(None);
        let noon = FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
        let night = FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 22, 0, 0).unwrap());

        let open = router.status(&noon, "UTC");
        assert!(open.is_business_window);
        assert!(!open.ai_available);
        assert_eq!((open.window_start, open.window_end), (9, 18));
        assert_eq!(open.system_message, STATUS_HUMANS_AVAILABLE);

        let closed = router.status(&night, "UTC");
        assert!(!closed.is_business_window);
        assert!(closed.ai_available);
        assert_eq!(closed.system_message, STATUS_AI_ONLINE);
        assert_eq!(closed.timezone, "UTC");
    }
}
