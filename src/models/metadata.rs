use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// External metadata sources, in merge priority order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MetadataSourceKind {
    AiInference,
    GoogleBooks,
    OpenLibrary,
}

impl Display for MetadataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataSourceKind::AiInference => write!(f, "ai_inference"),
            MetadataSourceKind::GoogleBooks => write!(f, "google_books"),
            MetadataSourceKind::OpenLibrary => write!(f, "open_library"),
        }
    }
}

/// What the caller is looking up
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetadataQuery {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
}

impl MetadataQuery {
    pub fn new(title: impl Into<String>, author: Option<&str>) -> Self {
        Self {
            title: title.into(),
            author: author.map(str::to_string),
        }
    }

    /// Normalized `title|author` cache key
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}",
            self.title.trim().to_lowercase(),
            self.author.as_deref().unwrap_or("").trim().to_lowercase()
        )
    }
}

/// Best-effort record returned by a single source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceCandidate {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub publication_year: Option<i32>,
    pub page_count: Option<u32>,
    pub cover_image_url: Option<String>,
    pub isbn: Option<String>,
    /// Source-specific identifier (Google volume id, Open Library work key)
    pub external_id: Option<String>,
    pub description: Option<String>,
}

/// Record assembled from every source that answered
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergedMetadataRecord {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication_year: Option<i32>,
    pub page_count: Option<u32>,
    pub cover_image_url: Option<String>,
    pub isbn: Option<String>,
    pub google_books_id: Option<String>,
    pub open_library_key: Option<String>,
    pub description: Option<String>,
    pub sources: Vec<MetadataSourceKind>,
}

impl MergedMetadataRecord {
    /// Accepted only with a non-empty title and author
    pub fn is_complete(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.title) && filled(&self.author)
    }
}
