//! Request extractor that resolves the bearer token to a live account.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::error::AuthError;

use super::model::User;

/// The authenticated account behind the request's bearer token.
///
/// Extraction rejects with 401 when the header is missing, the token fails
/// validation, or the account no longer exists.
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let user = state.auth.authorize(token).await?;
        Ok(AuthUser(user))
    }
}
