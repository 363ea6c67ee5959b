//! Feedback-aware book recommendation flow.
//!
//! Only an unusable provider (or a malformed request) is a hard error. Any
//! failure while building context, calling the provider or parsing its reply is
//! turned into an empty envelope whose summary explains what went wrong.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    BookRecommendation, BookRecommendationRequest, BookRecommendationResponse, UserTasteContext,
};
use crate::services::parser::parse_recommendations;
use crate::services::prompts::{build_book_prompt, BookPreferences};
use crate::services::providers::{LlmProvider, ProviderRegistry, SendOptions};
use crate::services::taste::{genre_key, ContextBuilder, ExclusionSet};

pub const MAX_BOOK_COUNT: usize = 20;

/// Confidence multiplier for books outside an explicit include list
pub const OUT_OF_PREFERENCE_FACTOR: f64 = 0.7;

const MAX_SUMMARY_GENRES: usize = 2;

#[derive(Clone)]
pub struct BookRecommender {
    context: ContextBuilder,
    providers: ProviderRegistry,
}

fn genre_matches(genre: &str, list: &[String]) -> bool {
    let genre = genre_key(genre);
    list.iter().any(|g| genre_key(g) == genre)
}

/// Exclusion, preference weighting, ordering and truncation over parsed items
pub fn rank_books(
    items: Vec<BookRecommendation>,
    context: &UserTasteContext,
    request: &BookRecommendationRequest,
) -> Vec<BookRecommendation> {
    let owned = ExclusionSet::from_display_names(&context.existing_books);

    let mut ranked: Vec<BookRecommendation> = items
        .into_iter()
        .filter(|book| {
            let excluded = owned.contains(&book.title, &book.author);
            if excluded {
                tracing::debug!(book = %book.display_name(), "Dropping already owned book");
            }
            !excluded
        })
        .filter(|book| !genre_matches(&book.genre, &request.exclude_genres))
        .map(|mut book| {
            book.confidence_score = book.confidence_score.clamp(0.0, 1.0);
            if !request.include_genres.is_empty()
                && !genre_matches(&book.genre, &request.include_genres)
            {
                book.confidence_score *= OUT_OF_PREFERENCE_FACTOR;
            }
            book
        })
        .collect();

    // Stable, so equal scores keep parser order
    ranked.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(request.count);
    ranked
}

/// One to three sentences naming the signals that shaped the result
pub fn summarize_context(context: &UserTasteContext) -> String {
    if !context.has_signals() {
        return "These are popular, well-reviewed picks to get you started. Rate books and react to recommendations to personalize future suggestions.".to_string();
    }

    let mut sentences = Vec::new();

    let genres: Vec<&str> = context
        .preferred_genres
        .iter()
        .take(MAX_SUMMARY_GENRES)
        .map(|g| g.genre.as_str())
        .collect();
    if !genres.is_empty() {
        sentences.push(format!(
            "Based on your preference for {}.",
            genres.join(" and ")
        ));
    }

    let favorite = context
        .favorites
        .first()
        .cloned()
        .or_else(|| context.highly_rated.first().map(|b| b.display_name()));
    if let Some(favorite) = favorite {
        sentences.push(format!("Similar to your favorite {}.", favorite));
    }

    if !context.recent_negative.is_empty() {
        sentences.push(
            "Steering away from books like the ones you recently marked as not interested."
                .to_string(),
        );
    }

    if sentences.is_empty() {
        sentences.push(format!(
            "Based on the {} books in your collection.",
            context.total_books
        ));
    }

    sentences.join(" ")
}

fn failure_summary(error: &AppError) -> String {
    format!(
        "We couldn't generate book recommendations right now ({}). Please try again in a moment.",
        error
    )
}

impl BookRecommender {
    pub fn new(context: ContextBuilder, providers: ProviderRegistry) -> Self {
        Self { context, providers }
    }

    pub async fn get_recommendations(
        &self,
        user_id: Uuid,
        request: &BookRecommendationRequest,
    ) -> AppResult<BookRecommendationResponse> {
        self.generate(user_id, request).await
    }

    /// Same pipeline, invoked explicitly after feedback
    pub async fn regenerate(
        &self,
        user_id: Uuid,
        request: &BookRecommendationRequest,
    ) -> AppResult<BookRecommendationResponse> {
        tracing::info!(user_id = %user_id, "Regenerating book recommendations after feedback");
        self.generate(user_id, request).await
    }

    async fn generate(
        &self,
        user_id: Uuid,
        request: &BookRecommendationRequest,
    ) -> AppResult<BookRecommendationResponse> {
        if request.count == 0 || request.count > MAX_BOOK_COUNT {
            return Err(AppError::InvalidInput(format!(
                "count must be between 1 and {}",
                MAX_BOOK_COUNT
            )));
        }

        let provider = self.providers.resolve(&request.provider)?;
        let kind = provider.kind();
        let session_id = Uuid::new_v4();

        let (recommendations, context_summary) =
            match self.run_pipeline(user_id, provider.as_ref(), request).await {
                Ok((parsed, context)) => {
                    let received = parsed.len();
                    let ranked = rank_books(parsed, &context, request);
                    tracing::info!(
                        user_id = %user_id,
                        provider = %kind,
                        session_id = %session_id,
                        received,
                        count = ranked.len(),
                        "Book recommendations ready"
                    );
                    (ranked, summarize_context(&context))
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        provider = %kind,
                        error = %e,
                        "Book recommendation pipeline failed, returning empty result"
                    );
                    (Vec::new(), failure_summary(&e))
                }
            };

        Ok(BookRecommendationResponse {
            session_id,
            total_recommendations: recommendations.len(),
            recommendations,
            context_summary,
            provider: kind,
        })
    }

    async fn run_pipeline(
        &self,
        user_id: Uuid,
        provider: &dyn LlmProvider,
        request: &BookRecommendationRequest,
    ) -> AppResult<(Vec<BookRecommendation>, UserTasteContext)> {
        let kind = provider.kind();
        let context = self.context.build_context(user_id).await?;

        let prompt = build_book_prompt(
            &context,
            &BookPreferences {
                include_genres: request.include_genres.clone(),
                exclude_genres: request.exclude_genres.clone(),
            },
            request.count,
        );

        tracing::info!(
            user_id = %user_id,
            provider = %kind,
            total_books = context.total_books,
            count = request.count,
            "Requesting book recommendations"
        );

        let raw = provider
            .send(&prompt, SendOptions::default())
            .await
            .map_err(|e| AppError::provider_call(kind, e))?;

        tracing::debug!(provider = %kind, response = %raw, "Raw provider response");

        let parsed = parse_recommendations(&raw, kind)?;
        Ok((parsed, context))
    }
}
