//! HTTP surface for signup, login, profile, and password recovery.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::AuthError;

use super::extract::AuthUser;
use super::model::Profile;
use super::service::{AuthPayload, GenericResponse};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(profile))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthPayload>), AuthError> {
    let payload = state
        .auth
        .signup(&request.name, &request.email, &request.password, &request.phone)
        .await?;
    Ok((StatusCode::CREATED, Json(payload)))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthPayload>, AuthError> {
    let payload = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(payload))
}

async fn profile(AuthUser(user): AuthUser) -> Json<Profile> {
    Json(user.profile())
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<GenericResponse>, AuthError> {
    let response = state.auth.forgot_password(&request.email).await?;
    Ok(Json(response))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<GenericResponse>, AuthError> {
    let response = state
        .auth
        .reset_password(&request.email, &request.code, &request.new_password)
        .await?;
    Ok(Json(response))
}
