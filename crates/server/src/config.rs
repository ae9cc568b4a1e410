use allianceforge_engine::reply::{
    DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
use allianceforge_engine::{BusinessHours, OpenAiBackend};
use anyhow::Context;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 39333;

/// Server settings. Every field has a default so a partial YAML file works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    /// Browser origins allowed to call the API (exact `scheme://host[:port]`).
    pub allowed_origins: Vec<String>,
    pub business_hours: BusinessHours,
    pub reply_backend: ReplyBackendConfig,
    pub rng_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            db_path: default_db_path(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            business_hours: BusinessHours::default(),
            reply_backend: ReplyBackendConfig::default(),
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplyBackendConfig {
    pub enabled: bool,
    /// Falls back to `OPENAI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ReplyBackendConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const MODEL_ENV: &str = "OPENAI_MODEL_NAME";

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ReplyBackendConfig {
    /// `None` means replies always come from the offline template.
    pub fn build(&self) -> Option<OpenAiBackend> {
        self.build_with(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(MODEL_ENV).ok(),
        )
    }

    /// The configured key beats `OPENAI_API_KEY`; `OPENAI_MODEL_NAME` beats the
    /// configured model. Blank values count as unset.
    pub fn build_with(
        &self,
        env_api_key: Option<String>,
        env_model: Option<String>,
    ) -> Option<OpenAiBackend> {
        if !self.enabled {
            return None;
        }
        let api_key = non_blank(self.api_key.clone()).or_else(|| non_blank(env_api_key))?;
        let model = non_blank(env_model).unwrap_or_else(|| self.model.clone());
        Some(
            OpenAiBackend::new(api_key)
                .with_model(model)
                .with_base_url(self.base_url.clone())
                .with_timeout(Duration::from_secs(self.timeout_secs))
                .with_max_tokens(self.max_tokens)
                .with_temperature(self.temperature),
        )
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".allianceforge")
        .join("allianceforge.db")
}

impl ServerConfig {
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_yaml::from_str(text).context("parse server config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        Self::from_yaml(&text)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let BusinessHours { start, end } = self.business_hours;
        if start >= end || end > 24 {
            anyhow::bail!("business_hours must satisfy start < end <= 24 (got {start}..{end})");
        }
        Ok(())
    }
}
