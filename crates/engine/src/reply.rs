//! C.O.R.E. reply generation.
//!
//! A [`ReplyBackend`] is optional. When it is missing or fails, replies come
//! from a fixed template so the caller always gets displayable text.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CORE_PERSONA_PROMPT: &str = "You are C.O.R.E., the AI companion for Alliance Forge: Forgeite Frenzy, a sci-fi incremental clicker game. You help commanders (players) who are leading humanity's escape from a doomed Earth.

Your personality:
- Professional but encouraging military AI
- Knowledgeable about space strategy and fleet management
- Supportive and motivational
- Uses sci-fi terminology appropriately
- Keeps responses concise but helpful

Context: Humanity has discovered that Earth will be destroyed, and players are commanders building fleets to evacuate and find new worlds. They tap to earn points, upgrade their ships, and compete on leaderboards.

Always include a motivational element in your responses. Keep responses under 150 words.";

pub const MOTIVATIONAL_LINES: [&str; 8] = [
    "Stay strong, Commander! The Alliance needs your leadership.",
    "Every tap brings us closer to victory against the unknown threat.",
    "Your dedication to the mission is inspiring the entire fleet.",
    "Remember, we're not just surviving - we're thriving among the stars.",
    "The future of humanity depends on commanders like you.",
    "Your strategic mind is exactly what the Alliance needs right now.",
    "Keep pushing forward - the galaxy is counting on us!",
    "Excellence is not an act, but a habit. You're proving that every day.",
];

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("reply backend request failed: {0}")]
    Transport(String),
    #[error("reply backend returned status {0}")]
    Status(u16),
    #[error("reply backend payload was malformed: {0}")]
    Malformed(String),
    #[error("reply backend returned no text")]
    Empty,
}

#[async_trait]
pub trait ReplyBackend: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String, BackendError>;
}

pub fn fallback_reply<R: Rng + ?Sized>(user_text: &str, rng: &mut R) -> String {
    let line = MOTIVATIONAL_LINES
        .choose(rng)
        .copied()
        .unwrap_or(MOTIVATIONAL_LINES[0]);
    format!(
        "C.O.R.E. AI: I understand your message about \"{user_text}\". {line} Unfortunately, my full AI capabilities are currently offline for maintenance."
    )
}

/// OpenAI chat-completions backend. One attempt per call, bounded by `timeout`.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [CompletionMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoiceMessage {
    content: Option<String>,
}

fn extract_reply(body: CompletionResponse) -> Result<String, BackendError> {
    let text = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(BackendError::Empty);
    }
    Ok(text)
}

#[async_trait]
impl ReplyBackend for OpenAiBackend {
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String, BackendError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                CompletionMessage {
                    role: "system",
                    content: system_prompt,
                },
                CompletionMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        extract_reply(parsed)
    }
}
