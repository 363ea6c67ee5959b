use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{
    BookRecommendationRequest, BookRecommendationResponse, FeedbackOutcome, FeedbackRequest,
    MealRecommendationRequest, MealRecommendationResponse, MergedMetadataRecord, MetadataQuery,
    UserTasteContext,
};
use crate::services::providers::ProviderStatus;

use super::{AppState, AuthUser};

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Which providers can currently be used
pub async fn list_providers(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Json<Vec<ProviderStatus>> {
    Json(state.providers.statuses())
}

pub async fn recommend_meals(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<MealRecommendationRequest>,
) -> AppResult<Json<MealRecommendationResponse>> {
    let response = state.meals.get_recommendations(user.id(), &request).await?;
    Ok(Json(response))
}

pub async fn recommend_books(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<BookRecommendationRequest>,
) -> AppResult<Json<BookRecommendationResponse>> {
    let response = state.books.get_recommendations(user.id(), &request).await?;
    Ok(Json(response))
}

pub async fn regenerate_books(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<BookRecommendationRequest>,
) -> AppResult<Json<BookRecommendationResponse>> {
    let response = state.books.regenerate(user.id(), &request).await?;
    Ok(Json(response))
}

pub async fn book_context(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<UserTasteContext>> {
    let context = state.context.build_context(user.id()).await?;
    Ok(Json(context))
}

pub async fn record_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<(StatusCode, Json<FeedbackOutcome>)> {
    let outcome = state.feedback.record_feedback(user.id(), &request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn book_metadata(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<MetadataQuery>,
) -> AppResult<Json<MergedMetadataRecord>> {
    state
        .metadata
        .fetch(&query)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no metadata found for '{}'", query.title)))
}
