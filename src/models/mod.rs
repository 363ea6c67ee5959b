pub mod book;
pub mod family;
pub mod lenient;
pub mod meal;
pub mod metadata;

pub use book::{
    BookRecommendation, BookRecommendationRequest, BookRecommendationResponse, FeedbackContextSnapshot,
    FeedbackEvent, FeedbackKind, FeedbackOutcome, FeedbackRequest, GenreShare, LibraryBook,
    NewLibraryBook, RatedBook, ReadingLevel, ReadingStatus, UserTasteContext,
};
pub use family::{AuthenticatedUser, FamilyMemberProfile, Ingredient, MemberPreferences, PantryItem};
pub use meal::{
    Difficulty, IngredientNeeded, MealRecommendation, MealRecommendationRequest,
    MealRecommendationResponse,
};
pub use metadata::{MergedMetadataRecord, MetadataQuery, MetadataSourceKind, SourceCandidate};
