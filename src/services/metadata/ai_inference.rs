use serde::Deserialize;

use super::{non_empty, MetadataSource};
use crate::error::{AppError, AppResult};
use crate::models::{lenient, MetadataQuery, MetadataSourceKind, SourceCandidate};
use crate::services::parser::extract_json_object;
use crate::services::providers::{ProviderRegistry, SendOptions};

const INFERENCE_OPTIONS: SendOptions = SendOptions {
    max_output_tokens: 1000,
    temperature: 0.2,
};

/// Asks the configured language model for bibliographic facts
#[derive(Clone)]
pub struct AiInferenceSource {
    providers: ProviderRegistry,
    provider: String,
}

#[derive(Debug, Default, Deserialize)]
struct InferredBook {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_year")]
    publication_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    page_count: Option<u32>,
    #[serde(default)]
    isbn: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl From<InferredBook> for SourceCandidate {
    fn from(book: InferredBook) -> Self {
        Self {
            title: non_empty(book.title),
            authors: non_empty(book.author).into_iter().collect(),
            publication_year: book.publication_year,
            page_count: book.page_count,
            cover_image_url: None,
            isbn: non_empty(book.isbn),
            external_id: None,
            description: non_empty(book.description),
        }
    }
}

impl AiInferenceSource {
    pub fn new(providers: ProviderRegistry, provider: impl Into<String>) -> Self {
        Self {
            providers,
            provider: provider.into(),
        }
    }

    fn build_prompt(query: &MetadataQuery) -> String {
        let author = query
            .author
            .as_deref()
            .map(|a| format!(" by {}", a.trim()))
            .unwrap_or_default();

        format!(
            "Provide bibliographic details for the book \"{}\"{}.\n\
             Use null for anything you are not sure about.\n\
             Return ONLY valid JSON in exactly this format, with no other text:\n\
             {{\"title\": \"string\", \"author\": \"string\", \"publication_year\": int, \
             \"page_count\": int, \"isbn\": \"string\", \"description\": \"string\"}}\n",
            query.title.trim(),
            author
        )
    }

    fn parse_reply(raw: &str) -> AppResult<Option<SourceCandidate>> {
        let value = extract_json_object(raw)?;
        let book: InferredBook = serde_json::from_value(value)
            .map_err(|e| AppError::ExternalApi(format!("unexpected inference shape: {}", e)))?;

        let candidate = SourceCandidate::from(book);
        Ok(candidate.title.is_some().then_some(candidate))
    }
}

#[async_trait::async_trait]
impl MetadataSource for AiInferenceSource {
    fn kind(&self) -> MetadataSourceKind {
        MetadataSourceKind::AiInference
    }

    async fn lookup(&self, query: &MetadataQuery) -> AppResult<Option<SourceCandidate>> {
        let provider = self.providers.resolve(&self.provider)?;
        let kind = provider.kind();

        let raw = provider
            .send(&Self::build_prompt(query), INFERENCE_OPTIONS)
            .await
            .map_err(|e| AppError::provider_call(kind, e))?;

        Self::parse_reply(&raw)
    }
}
