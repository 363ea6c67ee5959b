//! Anthropic Messages API provider.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::{ensure_success, LlmProvider, ProviderError, ProviderKind, RetryPolicy, SendOptions};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct ClaudeProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: Option<String>,
        api_url: String,
        model: String,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url,
            model,
            retry,
        }
    }

    fn build_request<'a>(&'a self, prompt: &'a str, options: SendOptions) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: options.max_output_tokens,
            temperature: options.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        }
    }

    fn extract_text(response: MessagesResponse) -> Result<String, ProviderError> {
        response
            .content
            .into_iter()
            .find_map(|block| (block.block_type == "text").then_some(block.text).flatten())
            .ok_or_else(|| ProviderError::InvalidResponse("no text content in response".to_string()))
    }

    async fn send_once(
        &self,
        api_key: &str,
        prompt: &str,
        options: SendOptions,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(prompt, options))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body: MessagesResponse = response.json().await?;
        Self::extract_text(body)
    }
}

#[async_trait::async_trait]
impl LlmProvider for ClaudeProvider {
    async fn send(&self, prompt: &str, options: SendOptions) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;

        tracing::debug!(
            provider = "claude",
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending prompt"
        );

        self.retry
            .run(ProviderKind::Claude, || self.send_once(api_key, prompt, options))
            .await
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}
