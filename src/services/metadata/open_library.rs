//! Open Library search API.

use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::{scoring::pick_best, MetadataSource};
use crate::error::{AppError, AppResult};
use crate::models::{MetadataQuery, MetadataSourceKind, SourceCandidate};

const SEARCH_LIMIT: &str = "5";
const COVER_URL: &str = "https://covers.openlibrary.org/b/id";

#[derive(Clone)]
pub struct OpenLibrarySource {
    http_client: HttpClient,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    key: Option<String>,
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    first_publish_year: Option<i32>,
    number_of_pages_median: Option<u32>,
    #[serde(default)]
    isbn: Vec<String>,
    cover_i: Option<i64>,
    #[serde(default)]
    first_sentence: Vec<String>,
}

impl From<SearchDoc> for SourceCandidate {
    fn from(doc: SearchDoc) -> Self {
        // Prefer ISBN-13 when the edition list mixes both lengths
        let isbn = doc
            .isbn
            .iter()
            .find(|i| i.len() == 13)
            .or_else(|| doc.isbn.first())
            .cloned();

        Self {
            title: doc.title,
            authors: doc.author_name,
            publication_year: doc.first_publish_year,
            page_count: doc.number_of_pages_median.filter(|&p| p > 0),
            cover_image_url: doc
                .cover_i
                .filter(|&id| id > 0)
                .map(|id| format!("{}/{}-L.jpg", COVER_URL, id)),
            isbn,
            external_id: doc.key,
            description: doc.first_sentence.into_iter().next(),
        }
    }
}

impl OpenLibrarySource {
    pub fn new(http_client: HttpClient, api_url: String) -> Self {
        Self {
            http_client,
            api_url,
        }
    }
}

#[async_trait::async_trait]
impl MetadataSource for OpenLibrarySource {
    fn kind(&self) -> MetadataSourceKind {
        MetadataSourceKind::OpenLibrary
    }

    async fn lookup(&self, query: &MetadataQuery) -> AppResult<Option<SourceCandidate>> {
        let url = format!("{}/search.json", self.api_url);

        let mut params = vec![("title", query.title.trim()), ("limit", SEARCH_LIMIT)];
        if let Some(author) = query.author.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            params.push(("author", author));
        }

        let response = self.http_client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Open Library returned status {}: {}",
                status, body
            )));
        }

        let search: SearchResponse = response.json().await?;
        tracing::debug!(
            source = "open_library",
            results = search.docs.len(),
            "Open Library search completed"
        );

        let candidates = search.docs.into_iter().map(SourceCandidate::from).collect();
        Ok(pick_best(candidates, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_FIXTURE: &str = r#"{
        "numFound": 2,
        "docs": [
            {
                "key": "/works/OL24034W",
                "title": "The Hobbit",
                "author_name": ["J.R.R. Tolkien"],
                "first_publish_year": 1937,
                "number_of_pages_median": 310,
                "isbn": ["0261102214", "9780261102217"],
                "cover_i": 6979861,
                "first_sentence": ["In a hole in the ground there lived a hobbit."]
            },
            {
                "key": "/works/OL999W",
                "title": "Guide to The Hobbit"
            }
        ]
    }"#;

    #[test]
    fn test_doc_maps_to_candidate() {
        let response: SearchResponse = serde_json::from_str(SEARCH_FIXTURE).unwrap();
        let candidate = SourceCandidate::from(response.docs.into_iter().next().unwrap());

        assert_eq!(candidate.title.as_deref(), Some("The Hobbit"));
        assert_eq!(candidate.publication_year, Some(1937));
        assert_eq!(candidate.page_count, Some(310));
        assert_eq!(candidate.isbn.as_deref(), Some("9780261102217"));
        assert_eq!(
            candidate.cover_image_url.as_deref(),
            Some("https://covers.openlibrary.org/b/id/6979861-L.jpg")
        );
        assert_eq!(candidate.external_id.as_deref(), Some("/works/OL24034W"));
        assert_eq!(
            candidate.description.as_deref(),
            Some("In a hole in the ground there lived a hobbit.")
        );
    }

    #[test]
    fn test_sparse_doc_maps_to_empty_fields() {
        let response: SearchResponse = serde_json::from_str(SEARCH_FIXTURE).unwrap();
        let candidate = SourceCandidate::from(response.docs.into_iter().nth(1).unwrap());

        assert!(candidate.authors.is_empty());
        assert!(candidate.isbn.is_none());
        assert!(candidate.cover_image_url.is_none());
    }

    #[test]
    fn test_author_match_breaks_title_tie() {
        let response: SearchResponse = serde_json::from_str(SEARCH_FIXTURE).unwrap();
        let candidates = response.docs.into_iter().map(SourceCandidate::from).collect();

        let best = pick_best(candidates, &MetadataQuery::new("hobbit", Some("tolkien"))).unwrap();
        assert_eq!(best.external_id.as_deref(), Some("/works/OL24034W"));
    }
}
