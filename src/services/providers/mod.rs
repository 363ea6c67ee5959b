//! Language model provider abstraction
//!
//! Every backend is reduced to "send a prompt, get text back". The registry is
//! built once at startup from whichever credentials are configured; a backend
//! without credentials stays registered but reports itself unavailable so that
//! callers can fail fast before any network call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod retry;

pub use claude::ClaudeProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use retry::RetryPolicy;

/// Identifier of an interchangeable backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Claude,
    OpenAi,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::Claude, ProviderKind::OpenAi, ProviderKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Provenance tag appended to every item this provider generated
    pub fn generated_tag(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "Claude-Generated",
            ProviderKind::OpenAi => "OpenAI-Generated",
            ProviderKind::Gemini => "Gemini-Generated",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(AppError::ProviderUnavailable(format!(
                "unknown provider '{}'",
                other
            ))),
        }
    }
}

/// Generation knobs passed through to the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 4000,
            temperature: 0.7,
        }
    }
}

/// Transport-level failure from a provider
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("provider has no credentials configured")]
    NotConfigured,
}

impl ProviderError {
    /// Network failures and 5xx responses are retried; everything else surfaces at once
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Status { status, .. } => *status >= 500,
            ProviderError::InvalidResponse(_) | ProviderError::NotConfigured => false,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    /// The request URL is dropped so it never reaches responses or logs
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Turns a non-success HTTP response into a `ProviderError::Status`
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        message: body,
    })
}

/// Uniform text-in, text-out interface over one backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a prompt and return the raw completion text
    async fn send(&self, prompt: &str, options: SendOptions) -> Result<String, ProviderError>;

    /// True iff the provider was configured with credentials at startup
    fn is_available(&self) -> bool;

    fn kind(&self) -> ProviderKind;

    fn model(&self) -> String;
}

/// Availability report for one provider
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderStatus {
    pub provider: ProviderKind,
    pub available: bool,
    pub model: String,
}

/// Fixed set of providers keyed by identifier
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one client per provider kind; missing keys leave that client unavailable
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider_timeout_secs))
            .build()?;
        let retry = RetryPolicy::default();

        let registry = Self::new()
            .with_provider(Arc::new(ClaudeProvider::new(
                http_client.clone(),
                config.anthropic_api_key.clone(),
                config.anthropic_api_url.clone(),
                config.claude_model.clone(),
                retry.clone(),
            )))
            .with_provider(Arc::new(OpenAiProvider::new(
                http_client.clone(),
                config.openai_api_key.clone(),
                config.openai_api_url.clone(),
                config.openai_model.clone(),
                retry.clone(),
            )))
            .with_provider(Arc::new(GeminiProvider::new(
                http_client,
                config.gemini_api_key.clone(),
                config.gemini_api_url.clone(),
                config.gemini_model.clone(),
                retry,
            )));

        for status in registry.statuses() {
            tracing::info!(
                provider = %status.provider,
                available = status.available,
                model = %status.model,
                "Registered language model provider"
            );
        }

        Ok(registry)
    }

    pub fn with_provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    /// Resolves a provider key, failing fast when it is unknown or has no credentials
    pub fn resolve(&self, key: &str) -> AppResult<Arc<dyn LlmProvider>> {
        let kind: ProviderKind = key.parse()?;
        self.resolve_kind(kind)
    }

    pub fn resolve_kind(&self, kind: ProviderKind) -> AppResult<Arc<dyn LlmProvider>> {
        match self.providers.get(&kind) {
            Some(provider) if provider.is_available() => Ok(provider.clone()),
            Some(_) => Err(AppError::ProviderUnavailable(format!(
                "{} has no API key configured",
                kind
            ))),
            None => Err(AppError::ProviderUnavailable(format!(
                "{} is not registered",
                kind
            ))),
        }
    }

    /// Availability of every registered provider, in a stable order
    pub fn statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses: Vec<ProviderStatus> = self
            .providers
            .values()
            .map(|p| ProviderStatus {
                provider: p.kind(),
                available: p.is_available(),
                model: p.model(),
            })
            .collect();
        statuses.sort_by_key(|s| s.provider);
        statuses
    }
}
