use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes and layers
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/providers", get(handlers::list_providers))
        // Meals
        .route("/meals/recommendations", post(handlers::recommend_meals))
        // Books
        .route("/books/recommendations", post(handlers::recommend_books))
        .route(
            "/books/recommendations/regenerate",
            post(handlers::regenerate_books),
        )
        .route("/books/context", get(handlers::book_context))
        .route("/books/feedback", post(handlers::record_feedback))
        // Metadata
        .route("/metadata/books", get(handlers::book_metadata))
}
