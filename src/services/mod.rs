pub mod books;
pub mod meals;
pub mod metadata;
pub mod parser;
pub mod prompts;
pub mod providers;
pub mod taste;

pub use books::BookRecommender;
pub use meals::MealRecommender;
pub use metadata::MetadataMerger;
pub use providers::ProviderRegistry;
pub use taste::{ContextBuilder, FeedbackLearner};
