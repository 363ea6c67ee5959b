use std::sync::Arc;

use crate::db::{HouseholdStore, LibraryStore};
use crate::services::{
    BookRecommender, ContextBuilder, FeedbackLearner, MealRecommender, MetadataMerger,
    ProviderRegistry,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub providers: ProviderRegistry,
    pub meals: MealRecommender,
    pub books: BookRecommender,
    pub context: ContextBuilder,
    pub feedback: FeedbackLearner,
    pub metadata: MetadataMerger,
}

impl AppState {
    /// Wires every service over the given stores and provider registry
    pub fn new(
        household: Arc<dyn HouseholdStore>,
        library: Arc<dyn LibraryStore>,
        providers: ProviderRegistry,
        metadata: MetadataMerger,
    ) -> Self {
        let context = ContextBuilder::new(library.clone());

        Self {
            meals: MealRecommender::new(household, providers.clone()),
            books: BookRecommender::new(context.clone(), providers.clone()),
            feedback: FeedbackLearner::new(library),
            context,
            providers,
            metadata,
        }
    }
}
