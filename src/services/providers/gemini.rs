//! Google Gemini generateContent provider.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::{ensure_success, LlmProvider, ProviderError, ProviderKind, RetryPolicy, SendOptions};

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
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

    fn build_request(prompt: &str, options: SendOptions) -> GenerateRequest<'_> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: options.max_output_tokens,
                temperature: options.temperature,
            },
        }
    }

    /// Concatenates the text parts of the first candidate
    fn extract_text(response: GenerateResponse) -> Result<String, ProviderError> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no candidates in response".to_string()))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "candidate has no text parts".to_string(),
            ));
        }
        Ok(text)
    }

    async fn send_once(
        &self,
        api_key: &str,
        prompt: &str,
        options: SendOptions,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request(prompt, options))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let body: GenerateResponse = response.json().await?;
        Self::extract_text(body)
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn send(&self, prompt: &str, options: SendOptions) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;

        tracing::debug!(
            provider = "gemini",
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending prompt"
        );

        self.retry
            .run(ProviderKind::Gemini, || self.send_once(api_key, prompt, options))
            .await
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}
