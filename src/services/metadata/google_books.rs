//! Google Books volumes search.

use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::{non_empty, scoring::pick_best, MetadataSource};
use crate::error::{AppError, AppResult};
use crate::models::{MetadataQuery, MetadataSourceKind, SourceCandidate};

const MAX_RESULTS: &str = "5";

#[derive(Clone)]
pub struct GoogleBooksSource {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: String,
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    published_date: Option<String>,
    page_count: Option<u32>,
    description: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

impl From<Volume> for SourceCandidate {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;

        let isbn = ["ISBN_13", "ISBN_10"].iter().find_map(|wanted| {
            info.industry_identifiers
                .iter()
                .find(|id| id.kind == *wanted)
                .map(|id| id.identifier.clone())
        });

        let cover_image_url = info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(|url| url.replacen("http://", "https://", 1));

        let title = match (non_empty(info.title), non_empty(info.subtitle)) {
            (Some(title), Some(subtitle)) => Some(format!("{}: {}", title, subtitle)),
            (title, _) => title,
        };

        Self {
            title,
            authors: info.authors,
            publication_year: info
                .published_date
                .as_deref()
                .and_then(|d| d.get(..4))
                .and_then(|y| y.parse().ok()),
            page_count: info.page_count.filter(|&p| p > 0),
            cover_image_url,
            isbn,
            external_id: Some(volume.id),
            description: info.description,
        }
    }
}

impl GoogleBooksSource {
    pub fn new(http_client: HttpClient, api_key: Option<String>, api_url: String) -> Self {
        Self {
            http_client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url,
        }
    }

    fn search_terms(query: &MetadataQuery) -> String {
        match query.author.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(author) => format!("intitle:{} inauthor:{}", query.title.trim(), author),
            None => format!("intitle:{}", query.title.trim()),
        }
    }
}

#[async_trait::async_trait]
impl MetadataSource for GoogleBooksSource {
    fn kind(&self) -> MetadataSourceKind {
        MetadataSourceKind::GoogleBooks
    }

    async fn lookup(&self, query: &MetadataQuery) -> AppResult<Option<SourceCandidate>> {
        let url = format!("{}/volumes", self.api_url);
        let terms = Self::search_terms(query);

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("q", terms.as_str()), ("maxResults", MAX_RESULTS)]);
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("x-goog-api-key", key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Google Books returned status {}: {}",
                status, body
            )));
        }

        let volumes: VolumesResponse = response.json().await?;
        tracing::debug!(
            source = "google_books",
            results = volumes.items.len(),
            "Volume search completed"
        );

        let candidates = volumes.items.into_iter().map(SourceCandidate::from).collect();
        Ok(pick_best(candidates, query))
    }
}
