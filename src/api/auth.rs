use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::AuthenticatedUser;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ADMIN_HEADER: &str = "x-user-admin";

/// Caller identity forwarded by the auth gateway
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl AuthUser {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let raw_id = header_str(headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;
        let id = Uuid::parse_str(raw_id)
            .map_err(|_| AppError::Unauthorized(format!("invalid {} header", USER_ID_HEADER)))?;

        let is_admin = header_str(headers, USER_ADMIN_HEADER)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self(AuthenticatedUser {
            id,
            email: header_str(headers, USER_EMAIL_HEADER).map(str::to_string),
            name: header_str(headers, USER_NAME_HEADER).map(str::to_string),
            is_admin,
        }))
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = Self::from_headers(&parts.headers)?;
        tracing::Span::current().record("user_id", tracing::field::display(user.id()));
        Ok(user)
    }
}
