//! Error types for the vasop backend.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Authentication and account-recovery errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("This email is already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or expired reset code")]
    InvalidResetCode,

    #[error("Reset code has expired. Please request a new one.")]
    ResetCodeExpired,

    #[error("New password cannot be the same as your current password. Please choose a different password.")]
    PasswordReused,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Onboarding lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Speech synthesis and moderation errors.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Speech provider key not configured")]
    NotConfigured,

    #[error("Speech generation failed: {0}")]
    Generation(String),
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidResetCode
            | AuthError::ResetCodeExpired
            | AuthError::PasswordReused
            | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
            AuthError::Hashing(_) | AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            // Internal details stay out of responses
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl IntoResponse for OnboardingError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Onboarding operation failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

impl IntoResponse for SpeechError {
    fn into_response(self) -> Response {
        let status = match self {
            SpeechError::NotConfigured | SpeechError::Generation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
