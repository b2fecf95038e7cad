//! HTTP surface for the onboarding wizard.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::error::OnboardingError;

use super::model::{SaveAck, SaveProgressRequest, SubmitAck, SubmitRequest};

#[derive(Debug, Deserialize)]
pub struct PreviewVoiceRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/onboarding/save", post(save_progress))
        .route("/onboarding/my-submission", get(my_submission))
        .route("/onboarding/submit", post(submit))
        .route("/onboarding/preview-voice", post(preview_voice))
}

async fn save_progress(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<SaveProgressRequest>,
) -> Result<Json<SaveAck>, OnboardingError> {
    let ack = state.onboarding.save_progress(user.id, &request).await?;
    Ok(Json(ack))
}

/// Returns the wrapped submission, or an empty object when the user has
/// never saved anything.
async fn my_submission(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, OnboardingError> {
    let body = match state.onboarding.get_user_submission(user.id).await? {
        Some(view) => serde_json::to_value(view)?,
        None => serde_json::json!({}),
    };
    Ok(Json(body))
}

async fn submit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitAck>, OnboardingError> {
    let ack = state.onboarding.submit_onboarding(user.id, request).await?;
    Ok(Json(ack))
}

/// Public preview endpoint: no token required, so the wizard can play
/// voices before the account step.
async fn preview_voice(
    State(state): State<AppState>,
    Json(request): Json<PreviewVoiceRequest>,
) -> axum::response::Response {
    let text = request.text.as_deref().unwrap_or("").trim().to_string();
    if text.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Text is required" })),
        )
            .into_response();
    }
    let voice = request.voice.as_deref().unwrap_or("ash");

    if !state.speech.is_text_appropriate(&text).await {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Text contains inappropriate language" })),
        )
            .into_response();
    }

    match state.speech.generate_speech(&text, voice).await {
        Ok(audio) => ([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response(),
        Err(e) => e.into_response(),
    }
}
