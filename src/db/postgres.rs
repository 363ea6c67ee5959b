use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::{HouseholdStore, LibraryStore};
use crate::error::{AppError, AppResult};
use crate::models::{
    FamilyMemberProfile, FeedbackContextSnapshot, FeedbackEvent, FeedbackKind, Ingredient,
    LibraryBook, MemberPreferences, NewLibraryBook, PantryItem, ReadingStatus,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(FromRow)]
struct FamilyMemberRow {
    name: String,
    age: Option<i32>,
    dietary_restrictions: Vec<String>,
    likes: Vec<String>,
    dislikes: Vec<String>,
    preferred_cuisines: Vec<String>,
}

impl From<FamilyMemberRow> for FamilyMemberProfile {
    fn from(row: FamilyMemberRow) -> Self {
        Self {
            name: row.name,
            age: row.age.and_then(|a| u32::try_from(a).ok()),
            dietary_restrictions: row.dietary_restrictions,
            preferences: MemberPreferences {
                likes: row.likes,
                dislikes: row.dislikes,
                preferred_cuisines: row.preferred_cuisines,
            },
        }
    }
}

#[derive(FromRow)]
struct PantryRow {
    name: String,
    category: String,
    unit: String,
    quantity: f64,
}

#[derive(FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    author: String,
    genre: Option<String>,
    reading_status: String,
    is_favorite: bool,
    date_read: Option<DateTime<Utc>>,
}

impl TryFrom<BookRow> for LibraryBook {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let reading_status = ReadingStatus::parse(&row.reading_status).ok_or_else(|| {
            AppError::Internal(format!("Unknown reading status: {}", row.reading_status))
        })?;

        Ok(Self {
            id: row.id,
            title: row.title,
            author: row.author,
            genre: row.genre,
            reading_status,
            is_favorite: row.is_favorite,
            date_read: row.date_read,
        })
    }
}

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    user_id: Uuid,
    session_id: Uuid,
    title: String,
    author: String,
    kind: String,
    note: Option<String>,
    context: Json<FeedbackContextSnapshot>,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for FeedbackEvent {
    type Error = AppError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let kind = FeedbackKind::parse(&row.kind)
            .ok_or_else(|| AppError::Internal(format!("Unknown feedback kind: {}", row.kind)))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            session_id: row.session_id,
            title: row.title,
            author: row.author,
            kind,
            note: row.note,
            context: row.context.0,
            created_at: row.created_at,
        })
    }
}

/// Postgres-backed household and library store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HouseholdStore for PgStore {
    async fn family_members(&self, user_id: Uuid) -> AppResult<Vec<FamilyMemberProfile>> {
        let rows = sqlx::query_as::<_, FamilyMemberRow>(
            r#"
            SELECT name, age, dietary_restrictions, likes, dislikes, preferred_cuisines
            FROM family_members
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FamilyMemberProfile::from).collect())
    }

    async fn pantry(&self, user_id: Uuid) -> AppResult<Vec<PantryItem>> {
        let rows = sqlx::query_as::<_, PantryRow>(
            r#"
            SELECT i.name, i.category, i.unit, p.quantity
            FROM pantry_items p
            JOIN ingredients i ON i.id = p.ingredient_id
            WHERE p.user_id = $1
            ORDER BY p.created_at, p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PantryItem {
                ingredient: Ingredient {
                    name: row.name,
                    category: row.category,
                    unit: row.unit,
                },
                quantity: row.quantity,
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl LibraryStore for PgStore {
    async fn books(&self, user_id: Uuid) -> AppResult<Vec<LibraryBook>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, title, author, genre, reading_status, is_favorite, date_read
            FROM books
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LibraryBook::try_from).collect()
    }

    async fn ratings(&self, user_id: Uuid) -> AppResult<HashMap<Uuid, u8>> {
        let rows: Vec<(Uuid, i16)> =
            sqlx::query_as("SELECT book_id, rating FROM book_ratings WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(book_id, rating)| u8::try_from(rating).ok().map(|r| (book_id, r)))
            .collect())
    }

    async fn recent_feedback(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<FeedbackEvent>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT id, user_id, session_id, title, author, kind, note, context, created_at
            FROM book_feedback
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FeedbackEvent::try_from).collect()
    }

    async fn append_feedback(&self, event: FeedbackEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_feedback
                (id, user_id, session_id, title, author, kind, note, context, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(event.session_id)
        .bind(&event.title)
        .bind(&event.author)
        .bind(event.kind.as_str())
        .bind(&event.note)
        .bind(Json(&event.context))
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            user_id = %event.user_id,
            event_id = %event.id,
            kind = %event.kind,
            "Stored feedback event"
        );

        Ok(())
    }

    async fn add_book(&self, user_id: Uuid, book: NewLibraryBook) -> AppResult<LibraryBook> {
        let date_read = matches!(book.reading_status, ReadingStatus::Read).then(Utc::now);
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (id, user_id, title, author, genre, reading_status, date_read)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, author, genre, reading_status, is_favorite, date_read
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.genre)
        .bind(book.reading_status.as_str())
        .bind(date_read)
        .fetch_one(&self.pool)
        .await?;

        LibraryBook::try_from(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_row_rejects_unknown_status() {
        let row = BookRow {
            id: Uuid::new_v4(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: None,
            reading_status: "abandoned".to_string(),
            is_favorite: false,
            date_read: None,
        };
        assert!(matches!(LibraryBook::try_from(row), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_family_row_drops_negative_age() {
        let row = FamilyMemberRow {
            name: "Alice".to_string(),
            age: Some(-1),
            dietary_restrictions: vec![],
            likes: vec!["pasta".to_string()],
            dislikes: vec![],
            preferred_cuisines: vec![],
        };
        let member = FamilyMemberProfile::from(row);
        assert_eq!(member.age, None);
        assert_eq!(member.preferences.likes, vec!["pasta"]);
    }

    #[test]
    fn test_feedback_row_parses_kind() {
        let row = FeedbackRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            kind: "not_interested".to_string(),
            note: None,
            context: Json(FeedbackContextSnapshot::default()),
            created_at: Utc::now(),
        };
        let event = FeedbackEvent::try_from(row).unwrap();
        assert_eq!(event.kind, FeedbackKind::NotInterested);
    }
}
