//! Book metadata assembled from independent external sources.
//!
//! Sources are queried concurrently and merged under a fixed priority:
//! model inference first, then Google Books, then Open Library. A source that
//! errors or times out simply contributes nothing.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use crate::db::MetadataCache;
use crate::error::{AppError, AppResult};
use crate::models::{MergedMetadataRecord, MetadataQuery, MetadataSourceKind, SourceCandidate};

pub mod ai_inference;
pub mod google_books;
pub mod open_library;
pub mod scoring;

pub use ai_inference::AiInferenceSource;
pub use google_books::GoogleBooksSource;
pub use open_library::OpenLibrarySource;

/// One read-only lookup backend
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    fn kind(&self) -> MetadataSourceKind;

    /// Best single candidate for the query, if the source found anything
    async fn lookup(&self, query: &MetadataQuery) -> AppResult<Option<SourceCandidate>>;
}

/// Trims and drops empty strings
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn backfill<T>(
    slot: &mut Option<T>,
    value: Option<T>,
    field: &'static str,
    kind: MetadataSourceKind,
    origins: &mut HashMap<&'static str, MetadataSourceKind>,
) {
    if slot.is_none() && value.is_some() {
        *slot = value;
        origins.insert(field, kind);
    }
}

fn override_with<T>(
    slot: &mut Option<T>,
    value: Option<T>,
    field: &'static str,
    kind: MetadataSourceKind,
    origins: &mut HashMap<&'static str, MetadataSourceKind>,
) {
    if value.is_some() {
        *slot = value;
        origins.insert(field, kind);
    }
}

/// Merge candidates under the fixed source priority.
///
/// Google Books overrides the cover image; every other field is only
/// backfilled. `sources` lists exactly the sources whose values survived.
pub fn merge_candidates(
    mut candidates: Vec<(MetadataSourceKind, SourceCandidate)>,
) -> MergedMetadataRecord {
    candidates.sort_by_key(|(kind, _)| *kind);

    let mut record = MergedMetadataRecord::default();
    let mut origins: HashMap<&'static str, MetadataSourceKind> = HashMap::new();

    for (kind, candidate) in candidates {
        let author = if candidate.authors.is_empty() {
            None
        } else {
            non_empty(Some(candidate.authors.join(", ")))
        };

        backfill(&mut record.title, non_empty(candidate.title), "title", kind, &mut origins);
        backfill(&mut record.author, author, "author", kind, &mut origins);
        backfill(
            &mut record.publication_year,
            candidate.publication_year,
            "publication_year",
            kind,
            &mut origins,
        );
        backfill(&mut record.page_count, candidate.page_count, "page_count", kind, &mut origins);
        backfill(&mut record.isbn, non_empty(candidate.isbn), "isbn", kind, &mut origins);
        backfill(
            &mut record.description,
            non_empty(candidate.description),
            "description",
            kind,
            &mut origins,
        );

        let cover = non_empty(candidate.cover_image_url);
        let external_id = non_empty(candidate.external_id);
        match kind {
            MetadataSourceKind::GoogleBooks => {
                override_with(&mut record.cover_image_url, cover, "cover_image_url", kind, &mut origins);
                override_with(&mut record.google_books_id, external_id, "google_books_id", kind, &mut origins);
            }
            MetadataSourceKind::OpenLibrary => {
                backfill(&mut record.cover_image_url, cover, "cover_image_url", kind, &mut origins);
                backfill(&mut record.open_library_key, external_id, "open_library_key", kind, &mut origins);
            }
            MetadataSourceKind::AiInference => {
                backfill(&mut record.cover_image_url, cover, "cover_image_url", kind, &mut origins);
            }
        }
    }

    let sources: BTreeSet<MetadataSourceKind> = origins.into_values().collect();
    record.sources = sources.into_iter().collect();
    record
}

/// Fans lookups out to every source, merges and caches the result
#[derive(Clone)]
pub struct MetadataMerger {
    sources: Vec<Arc<dyn MetadataSource>>,
    cache: Arc<dyn MetadataCache>,
    source_timeout: Duration,
}

impl MetadataMerger {
    pub fn new(
        sources: Vec<Arc<dyn MetadataSource>>,
        cache: Arc<dyn MetadataCache>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            cache,
            source_timeout,
        }
    }

    /// `None` when the merged record lacks a title or an author
    pub async fn fetch(&self, query: &MetadataQuery) -> AppResult<Option<MergedMetadataRecord>> {
        if query.title.trim().is_empty() {
            return Err(AppError::InvalidInput("title cannot be empty".to_string()));
        }

        let key = query.cache_key();
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Metadata cache hit");
            return Ok(Some(cached));
        }

        let candidates = self.lookup_all(query).await;
        let record = merge_candidates(candidates);

        if !record.is_complete() {
            tracing::info!(
                title = %query.title,
                sources = record.sources.len(),
                "Rejected merged metadata without title and author"
            );
            return Ok(None);
        }

        tracing::info!(
            title = %query.title,
            sources = ?record.sources,
            "Merged book metadata"
        );

        self.cache.put(&key, &record).await;
        Ok(Some(record))
    }

    /// Queries every source concurrently; in-flight lookups are aborted if the caller goes away
    async fn lookup_all(&self, query: &MetadataQuery) -> Vec<(MetadataSourceKind, SourceCandidate)> {
        let mut lookups = JoinSet::new();

        for source in &self.sources {
            let source = source.clone();
            let query = query.clone();
            let timeout = self.source_timeout;
            lookups.spawn(async move {
                let kind = source.kind();
                (kind, tokio::time::timeout(timeout, source.lookup(&query)).await)
            });
        }

        let mut candidates = Vec::new();
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((kind, Ok(Ok(Some(candidate))))) => candidates.push((kind, candidate)),
                Ok((kind, Ok(Ok(None)))) => {
                    tracing::debug!(source = %kind, "Metadata source found nothing");
                }
                Ok((kind, Ok(Err(e)))) => {
                    tracing::warn!(source = %kind, error = %e, "Metadata source failed");
                }
                Ok((kind, Err(_))) => {
                    tracing::warn!(source = %kind, timeout = ?self.source_timeout, "Metadata source timed out");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Metadata lookup task failed");
                }
            }
        }

        candidates
    }
}
