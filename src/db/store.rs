use std::collections::HashMap;

use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    FamilyMemberProfile, FeedbackEvent, LibraryBook, NewLibraryBook, PantryItem,
};

/// Family and pantry data owned by the household CRUD layer
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HouseholdStore: Send + Sync {
    async fn family_members(&self, user_id: Uuid) -> AppResult<Vec<FamilyMemberProfile>>;

    async fn pantry(&self, user_id: Uuid) -> AppResult<Vec<PantryItem>>;
}

/// A user's book collection, ratings and feedback history
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryStore: Send + Sync {
    /// Every book in the collection, in collection order
    async fn books(&self, user_id: Uuid) -> AppResult<Vec<LibraryBook>>;

    /// Ratings (1..=5) keyed by book id
    async fn ratings(&self, user_id: Uuid) -> AppResult<HashMap<Uuid, u8>>;

    /// Newest first
    async fn recent_feedback(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<FeedbackEvent>>;

    /// Feedback is insert-only
    async fn append_feedback(&self, event: FeedbackEvent) -> AppResult<()>;

    async fn add_book(&self, user_id: Uuid, book: NewLibraryBook) -> AppResult<LibraryBook>;
}
