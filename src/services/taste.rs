//! Reading-history aggregation and feedback recording for the book flow.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::db::LibraryStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    FeedbackContextSnapshot, FeedbackEvent, FeedbackKind, FeedbackOutcome, FeedbackRequest,
    GenreShare, LibraryBook, NewLibraryBook, RatedBook, ReadingLevel, ReadingStatus,
    UserTasteContext,
};

pub const FEEDBACK_WINDOW: usize = 50;
const TOP_GENRES: usize = 5;
const HIGHLY_RATED_CAP: usize = 10;
const POORLY_RATED_CAP: usize = 5;
const RECENT_CAP: usize = 5;
const SNAPSHOT_CAP: usize = 5;

const HIGH_RATING: u8 = 4;
const LOW_RATING: u8 = 2;

const INTERMEDIATE_READ_COUNT: usize = 15;
const ADVANCED_READ_COUNT: usize = 50;
const ADVANCED_GENRE_COUNT: usize = 8;

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Case-insensitive identity of a genre label
pub(crate) fn genre_key(genre: &str) -> String {
    genre.trim().to_lowercase()
}

/// Genre counts, most frequent first.
///
/// Labels are counted case-insensitively and shown with their first-seen
/// spelling. Equal counts keep first-seen order.
fn rank_genres(books: &[LibraryBook]) -> Vec<GenreShare> {
    let mut counts: Vec<(String, String, usize)> = Vec::new();
    for genre in books
        .iter()
        .filter_map(|b| b.genre.as_deref())
        .map(str::trim)
        .filter(|g| !g.is_empty())
    {
        let key = genre_key(genre);
        match counts.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, _, count)) => *count += 1,
            None => counts.push((key, genre.to_string(), 1)),
        }
    }

    counts.sort_by(|a, b| b.2.cmp(&a.2));

    let total = books.len() as f64;
    counts
        .into_iter()
        .take(TOP_GENRES)
        .map(|(_, genre, count)| GenreShare {
            genre,
            count,
            percentage: round_one_decimal(count as f64 / total * 100.0),
        })
        .collect()
}

fn reading_level(read_books: &[&LibraryBook]) -> ReadingLevel {
    let distinct_genres: HashSet<String> = read_books
        .iter()
        .filter_map(|b| b.genre.as_deref())
        .map(genre_key)
        .filter(|g| !g.is_empty())
        .collect();

    if read_books.len() >= ADVANCED_READ_COUNT || distinct_genres.len() >= ADVANCED_GENRE_COUNT {
        ReadingLevel::Advanced
    } else if read_books.len() < INTERMEDIATE_READ_COUNT {
        ReadingLevel::Beginner
    } else {
        ReadingLevel::Intermediate
    }
}

/// Pure aggregation over one consistent snapshot of a user's data
pub fn summarize_taste(
    books: &[LibraryBook],
    ratings: &HashMap<Uuid, u8>,
    feedback: &[FeedbackEvent],
) -> UserTasteContext {
    let read: Vec<&LibraryBook> = books
        .iter()
        .filter(|b| b.reading_status == ReadingStatus::Read)
        .collect();

    let rated = |book: &&LibraryBook| {
        ratings.get(&book.id).map(|&rating| RatedBook {
            title: book.title.clone(),
            author: book.author.clone(),
            rating,
        })
    };

    let mut highly_rated: Vec<RatedBook> = read
        .iter()
        .filter_map(rated)
        .filter(|b| b.rating >= HIGH_RATING)
        .collect();
    highly_rated.sort_by(|a, b| b.rating.cmp(&a.rating));
    highly_rated.truncate(HIGHLY_RATED_CAP);

    let mut poorly_rated: Vec<RatedBook> = read
        .iter()
        .filter_map(rated)
        .filter(|b| b.rating <= LOW_RATING)
        .collect();
    poorly_rated.sort_by(|a, b| a.rating.cmp(&b.rating));
    poorly_rated.truncate(POORLY_RATED_CAP);

    let mut dated: Vec<&&LibraryBook> = read.iter().filter(|b| b.date_read.is_some()).collect();
    dated.sort_by(|a, b| b.date_read.cmp(&a.date_read));
    let recently_read = dated
        .into_iter()
        .take(RECENT_CAP)
        .map(|b| b.display_name())
        .collect();

    let recent_positive = feedback
        .iter()
        .filter(|e| e.kind.is_positive())
        .take(RECENT_CAP)
        .map(FeedbackEvent::display_name)
        .collect();
    let recent_negative = feedback
        .iter()
        .filter(|e| !e.kind.is_positive())
        .take(RECENT_CAP)
        .map(FeedbackEvent::display_name)
        .collect();

    // 0.0 doubles as "no ratings yet"
    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        let sum: u32 = ratings.values().map(|&r| u32::from(r)).sum();
        round_one_decimal(f64::from(sum) / ratings.len() as f64)
    };

    UserTasteContext {
        total_books: books.len(),
        read_count: read.len(),
        want_to_read_count: books
            .iter()
            .filter(|b| b.reading_status == ReadingStatus::WantToRead)
            .count(),
        preferred_genres: rank_genres(books),
        highly_rated,
        poorly_rated,
        recently_read,
        currently_reading: books
            .iter()
            .filter(|b| b.reading_status == ReadingStatus::Reading)
            .map(LibraryBook::display_name)
            .collect(),
        favorites: books
            .iter()
            .filter(|b| b.is_favorite)
            .map(LibraryBook::display_name)
            .collect(),
        recent_positive,
        recent_negative,
        existing_books: books.iter().map(LibraryBook::display_name).collect(),
        average_rating,
        reading_level: reading_level(&read),
    }
}

/// Lowercase, punctuation stripped, whitespace collapsed
fn normalize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

struct ExclusionEntry {
    full: String,
    title: String,
}

/// Owned books as "title by author", matched tolerantly against model output
pub struct ExclusionSet {
    entries: Vec<ExclusionEntry>,
}

impl ExclusionSet {
    pub fn from_display_names(names: &[String]) -> Self {
        let entries = names
            .iter()
            .map(|name| {
                let title = name.rsplit_once(" by ").map(|(t, _)| t).unwrap_or(name);
                ExclusionEntry {
                    full: normalize(name),
                    title: normalize(title),
                }
            })
            .filter(|e| !e.full.is_empty())
            .collect();
        Self { entries }
    }

    /// Exact, containment in either direction, or same title under a different author spelling
    pub fn contains(&self, title: &str, author: &str) -> bool {
        let full = normalize(&format!("{} by {}", title, author));
        let title = normalize(title);
        if full.is_empty() {
            return false;
        }

        self.entries.iter().any(|entry| {
            entry.full == full
                || full.contains(&entry.full)
                || entry.full.contains(&full)
                || (!title.is_empty() && entry.title == title)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a [`UserTasteContext`] per request from the library store
#[derive(Clone)]
pub struct ContextBuilder {
    library: Arc<dyn LibraryStore>,
}

impl ContextBuilder {
    pub fn new(library: Arc<dyn LibraryStore>) -> Self {
        Self { library }
    }

    pub async fn build_context(&self, user_id: Uuid) -> AppResult<UserTasteContext> {
        let books = self.library.books(user_id).await?;
        let ratings = self.library.ratings(user_id).await?;
        let feedback = self.library.recent_feedback(user_id, FEEDBACK_WINDOW).await?;

        let context = summarize_taste(&books, &ratings, &feedback);

        tracing::debug!(
            user_id = %user_id,
            total_books = context.total_books,
            ratings = ratings.len(),
            feedback_events = feedback.len(),
            reading_level = %context.reading_level,
            "Built taste context"
        );

        Ok(context)
    }
}

/// Records reactions to recommendations; never regenerates on its own
#[derive(Clone)]
pub struct FeedbackLearner {
    library: Arc<dyn LibraryStore>,
    context: ContextBuilder,
}

impl FeedbackLearner {
    pub fn new(library: Arc<dyn LibraryStore>) -> Self {
        Self {
            context: ContextBuilder::new(library.clone()),
            library,
        }
    }

    pub async fn record_feedback(
        &self,
        user_id: Uuid,
        request: &FeedbackRequest,
    ) -> AppResult<FeedbackOutcome> {
        let title = request.title.trim();
        let author = request.author.trim();
        if title.is_empty() || author.is_empty() {
            return Err(AppError::InvalidInput(
                "feedback requires a title and an author".to_string(),
            ));
        }

        let context = self.context.build_context(user_id).await?;
        let snapshot = FeedbackContextSnapshot {
            recent_titles: context.recently_read.iter().take(SNAPSHOT_CAP).cloned().collect(),
            preferred_genres: context
                .preferred_genres
                .iter()
                .take(SNAPSHOT_CAP)
                .map(|g| g.genre.clone())
                .collect(),
        };

        let event = FeedbackEvent {
            id: Uuid::new_v4(),
            user_id,
            session_id: request.session_id,
            title: title.to_string(),
            author: author.to_string(),
            kind: request.kind,
            note: request.note.clone().filter(|n| !n.trim().is_empty()),
            context: snapshot,
            created_at: Utc::now(),
        };
        let event_id = event.id;
        self.library.append_feedback(event).await?;

        let reading_status = match request.kind {
            FeedbackKind::AlreadyRead => Some(ReadingStatus::Read),
            FeedbackKind::WantToRead => Some(ReadingStatus::WantToRead),
            FeedbackKind::NotInterested => None,
        };

        let mut added_to_collection = false;
        if let Some(reading_status) = reading_status {
            let owned = ExclusionSet::from_display_names(&context.existing_books);
            if owned.contains(title, author) {
                tracing::debug!(user_id = %user_id, title = %title, "Book already in collection");
            } else {
                self.library
                    .add_book(
                        user_id,
                        NewLibraryBook {
                            title: title.to_string(),
                            author: author.to_string(),
                            genre: request.genre.clone().filter(|g| !g.trim().is_empty()),
                            reading_status,
                        },
                    )
                    .await?;
                added_to_collection = true;
            }
        }

        let should_regenerate = request.kind == FeedbackKind::NotInterested;

        tracing::info!(
            user_id = %user_id,
            session_id = %request.session_id,
            kind = %request.kind,
            should_regenerate,
            added_to_collection,
            "Recorded recommendation feedback"
        );

        Ok(FeedbackOutcome {
            event_id,
            should_regenerate,
            added_to_collection,
        })
    }
}
