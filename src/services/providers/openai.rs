//! OpenAI chat completions provider.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::{ensure_success, LlmProvider, ProviderError, ProviderKind, RetryPolicy, SendOptions};

const SYSTEM_MESSAGE: &str =
    "You are a helpful household assistant. You always answer with valid JSON when asked to.";

#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
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

    fn build_request<'a>(&'a self, prompt: &'a str, options: SendOptions) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: options.max_output_tokens,
            temperature: options.temperature,
        }
    }

    fn extract_text(response: ChatResponse) -> Result<String, ProviderError> {
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))
    }

    async fn send_once(
        &self,
        api_key: &str,
        prompt: &str,
        options: SendOptions,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.build_request(prompt, options))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body: ChatResponse = response.json().await?;
        Self::extract_text(body)
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn send(&self, prompt: &str, options: SendOptions) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;

        tracing::debug!(
            provider = "openai",
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending prompt"
        );

        self.retry
            .run(ProviderKind::OpenAi, || self.send_once(api_key, prompt, options))
            .await
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}
