pub mod auth;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::AuthUser;
pub use routes::create_router;
pub use state::AppState;
