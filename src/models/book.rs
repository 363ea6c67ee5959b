use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

use super::lenient;
use crate::services::providers::ProviderKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Read,
    Reading,
    WantToRead,
}

impl ReadingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Read => "read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::WantToRead => "want_to_read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(ReadingStatus::Read),
            "reading" | "currently_reading" => Some(ReadingStatus::Reading),
            "want_to_read" | "to_read" => Some(ReadingStatus::WantToRead),
            _ => None,
        }
    }
}

/// A book in the user's collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibraryBook {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub reading_status: ReadingStatus,
    pub is_favorite: bool,
    pub date_read: Option<DateTime<Utc>>,
}

impl LibraryBook {
    /// "Title by Author", the form used for exclusion and prompts
    pub fn display_name(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }
}

/// A book about to be added to the collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLibraryBook {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub reading_status: ReadingStatus,
}

/// How the user reacted to a recommended book
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    #[serde(alias = "already-read", alias = "accepted")]
    AlreadyRead,
    #[serde(alias = "want-to-read")]
    WantToRead,
    #[serde(alias = "not-interested")]
    NotInterested,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::AlreadyRead => "already_read",
            FeedbackKind::WantToRead => "want_to_read",
            FeedbackKind::NotInterested => "not_interested",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.replace('-', "_").as_str() {
            "already_read" | "accepted" => Some(FeedbackKind::AlreadyRead),
            "want_to_read" => Some(FeedbackKind::WantToRead),
            "not_interested" => Some(FeedbackKind::NotInterested),
            _ => None,
        }
    }

    pub fn is_positive(&self) -> bool {
        !matches!(self, FeedbackKind::NotInterested)
    }
}

impl Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context captured when feedback is recorded
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackContextSnapshot {
    pub recent_titles: Vec<String>,
    pub preferred_genres: Vec<String>,
}

/// Append-only record of a reaction to a recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub title: String,
    pub author: String,
    pub kind: FeedbackKind,
    pub note: Option<String>,
    pub context: FeedbackContextSnapshot,
    pub created_at: DateTime<Utc>,
}

impl FeedbackEvent {
    pub fn display_name(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenreShare {
    pub genre: String,
    pub count: usize,
    /// Share of the whole collection, one decimal place
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatedBook {
    pub title: String,
    pub author: String,
    pub rating: u8,
}

impl RatedBook {
    pub fn display_name(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadingLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl Display for ReadingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadingLevel::Beginner => write!(f, "beginner"),
            ReadingLevel::Intermediate => write!(f, "intermediate"),
            ReadingLevel::Advanced => write!(f, "advanced"),
        }
    }
}

/// Per-request aggregate of a user's reading history and feedback
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserTasteContext {
    pub total_books: usize,
    pub read_count: usize,
    pub want_to_read_count: usize,
    pub preferred_genres: Vec<GenreShare>,
    pub highly_rated: Vec<RatedBook>,
    pub poorly_rated: Vec<RatedBook>,
    pub recently_read: Vec<String>,
    pub currently_reading: Vec<String>,
    pub favorites: Vec<String>,
    pub recent_positive: Vec<String>,
    pub recent_negative: Vec<String>,
    /// Every owned book as "Title by Author"
    pub existing_books: Vec<String>,
    /// 0.0 when the user has no ratings
    pub average_rating: f64,
    pub reading_level: ReadingLevel,
}

impl UserTasteContext {
    pub fn has_signals(&self) -> bool {
        self.total_books > 0 || !self.recent_positive.is_empty() || !self.recent_negative.is_empty()
    }
}

fn default_book_count() -> usize {
    5
}

/// Request for feedback-aware book suggestions
#[derive(Debug, Clone, Deserialize)]
pub struct BookRecommendationRequest {
    #[serde(default = "default_book_count")]
    pub count: usize,
    pub provider: String,
    #[serde(default)]
    pub include_genres: Vec<String>,
    #[serde(default)]
    pub exclude_genres: Vec<String>,
}

fn default_confidence() -> f64 {
    lenient::DEFAULT_CONFIDENCE
}

/// One validated book suggestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookRecommendation {
    pub title: String,
    pub author: String,
    pub genre: String,
    #[serde(default, deserialize_with = "lenient::optional_year")]
    pub publication_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient::optional_count")]
    pub pages: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    pub reasoning: String,
    #[serde(default = "default_confidence", deserialize_with = "lenient::confidence")]
    pub confidence_score: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    pub ai_generated: bool,
    pub ai_provider: ProviderKind,
}

impl BookRecommendation {
    pub fn display_name(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }
}

/// Envelope returned by the book flow, including soft failures
#[derive(Debug, Clone, Serialize)]
pub struct BookRecommendationResponse {
    pub session_id: Uuid,
    pub recommendations: Vec<BookRecommendation>,
    pub total_recommendations: usize,
    pub context_summary: String,
    pub provider: ProviderKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub session_id: Uuid,
    pub title: String,
    pub author: String,
    pub kind: FeedbackKind,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackOutcome {
    pub event_id: Uuid,
    pub should_regenerate: bool,
    pub added_to_collection: bool,
}
