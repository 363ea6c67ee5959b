use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{HouseholdStore, LibraryStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    FamilyMemberProfile, FeedbackEvent, LibraryBook, NewLibraryBook, PantryItem, ReadingStatus,
};

/// In-process store used by tests and local seeding
#[derive(Default)]
pub struct MemoryStore {
    families: RwLock<HashMap<Uuid, Vec<FamilyMemberProfile>>>,
    pantries: RwLock<HashMap<Uuid, Vec<PantryItem>>>,
    books: RwLock<HashMap<Uuid, Vec<LibraryBook>>>,
    ratings: RwLock<HashMap<Uuid, HashMap<Uuid, u8>>>,
    feedback: RwLock<HashMap<Uuid, Vec<FeedbackEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_family(&self, user_id: Uuid, members: Vec<FamilyMemberProfile>) {
        self.families.write().await.insert(user_id, members);
    }

    pub async fn set_pantry(&self, user_id: Uuid, items: Vec<PantryItem>) {
        self.pantries.write().await.insert(user_id, items);
    }

    /// Adds an existing book with an optional 1..=5 rating
    pub async fn insert_book(
        &self,
        user_id: Uuid,
        book: LibraryBook,
        rating: Option<u8>,
    ) -> AppResult<()> {
        if let Some(rating) = rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::InvalidInput(format!(
                    "rating must be between 1 and 5, got {}",
                    rating
                )));
            }
            self.ratings
                .write()
                .await
                .entry(user_id)
                .or_default()
                .insert(book.id, rating);
        }

        self.books.write().await.entry(user_id).or_default().push(book);
        Ok(())
    }

    /// All feedback for a user, oldest first
    pub async fn feedback_log(&self, user_id: Uuid) -> Vec<FeedbackEvent> {
        self.feedback
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl HouseholdStore for MemoryStore {
    async fn family_members(&self, user_id: Uuid) -> AppResult<Vec<FamilyMemberProfile>> {
        Ok(self
            .families
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn pantry(&self, user_id: Uuid) -> AppResult<Vec<PantryItem>> {
        Ok(self
            .pantries
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl LibraryStore for MemoryStore {
    async fn books(&self, user_id: Uuid) -> AppResult<Vec<LibraryBook>> {
        Ok(self
            .books
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn ratings(&self, user_id: Uuid) -> AppResult<HashMap<Uuid, u8>> {
        Ok(self
            .ratings
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn recent_feedback(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<FeedbackEvent>> {
        let feedback = self.feedback.read().await;
        let mut events: Vec<FeedbackEvent> = feedback
            .get(&user_id)
            .map(|events| events.iter().rev().cloned().collect())
            .unwrap_or_default();

        // Insertion order already tracks time; the sort only matters for seeded events
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }

    async fn append_feedback(&self, event: FeedbackEvent) -> AppResult<()> {
        self.feedback
            .write()
            .await
            .entry(event.user_id)
            .or_default()
            .push(event);
        Ok(())
    }

    async fn add_book(&self, user_id: Uuid, book: NewLibraryBook) -> AppResult<LibraryBook> {
        let date_read = matches!(book.reading_status, ReadingStatus::Read).then(Utc::now);
        let book = LibraryBook {
            id: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            genre: book.genre,
            reading_status: book.reading_status,
            is_favorite: false,
            date_read,
        };

        self.books
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(book.clone());
        Ok(book)
    }
}
